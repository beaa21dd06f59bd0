use serde::Serialize;

/// Success bodies are wrapped as `{ "data": ... }`; errors use `{ "error", "code" }`.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
