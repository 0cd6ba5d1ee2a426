use crate::health::HealthEngine;
use crate::routes;
use actix_cors::Cors;
use actix_web::{dev::Server, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

pub fn run(listener: TcpListener, engine: Arc<HealthEngine>) -> Result<Server, std::io::Error> {
    let engine = web::Data::new(engine);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(actix_web::middleware::Compress::default())
            .wrap(Cors::permissive())
            .service(web::scope("/health_check").service(routes::health_check))
            .service(
                web::scope("/health")
                    .service(routes::report_handler)
                    .service(routes::run_handler)
                    .service(routes::status_handler)
                    .service(routes::history_handler)
                    .service(routes::autofix_handler)
                    .service(routes::cancel_autofix_handler)
                    .service(routes::autofix_list_handler),
            )
            .app_data(engine.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
