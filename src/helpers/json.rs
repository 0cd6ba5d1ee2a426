use actix_web::{http::StatusCode, HttpResponse};
use serde::Serialize;

/// Envelope shared by every JSON endpoint. Errors use the same
/// `status`/`code`/`message` keys through `EngineError`'s `ResponseError`.
#[derive(Serialize)]
pub(crate) struct JsonResponse<T> {
    pub(crate) status: String,
    pub(crate) message: String,
    pub(crate) code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) item: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) list: Option<Vec<T>>,
}

pub(crate) struct JsonResponseBuilder<T> {
    message: String,
    item: Option<T>,
    list: Option<Vec<T>>,
}

impl<T: Serialize> JsonResponse<T> {
    pub(crate) fn build() -> JsonResponseBuilder<T> {
        JsonResponseBuilder {
            message: String::new(),
            item: None,
            list: None,
        }
    }
}

impl<T: Serialize> JsonResponseBuilder<T> {
    pub(crate) fn set_item(mut self, item: T) -> Self {
        self.item = Some(item);
        self
    }

    pub(crate) fn set_list(mut self, list: Vec<T>) -> Self {
        self.list = Some(list);
        self
    }

    pub(crate) fn set_msg(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub(crate) fn ok(self) -> HttpResponse {
        self.respond(StatusCode::OK)
    }

    pub(crate) fn conflict(self) -> HttpResponse {
        self.respond(StatusCode::CONFLICT)
    }

    pub(crate) fn not_found(self) -> HttpResponse {
        self.respond(StatusCode::NOT_FOUND)
    }

    fn respond(self, code: StatusCode) -> HttpResponse {
        let status = if code.is_success() { "OK" } else { "Error" };
        let message = if self.message.trim().is_empty() {
            code.canonical_reason().unwrap_or("OK").to_string()
        } else {
            self.message
        };

        HttpResponse::build(code).json(JsonResponse {
            status: status.to_string(),
            message,
            code: code.as_u16(),
            item: self.item,
            list: self.list,
        })
    }
}
