use crate::constants::net::REQUEST_TIMEOUT;
use crate::util::error::RequestError;

pub enum Method {
    Get,
    /// contains request body
    Put(serde_json::Value)
}

/// client with the request timeout applied, shared by all requests of one adapter.
/// only fails if the tls backend can't be initialized.
pub fn client() -> Result<reqwest::Client, RequestError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(RequestError::Client)
}

/// send request and parse the response body as json.
/// non-2xx status codes are errors.
pub async fn send(client: &reqwest::Client, method: Method, url: &str) -> Result<serde_json::Value, RequestError> {
    let request = match method {
        Method::Get        => client.get(url),
        Method::Put(body)  => client.put(url).json(&body)
    };

    tracing::debug!(url, "sending request");
    let response = request.send().await.map_err(RequestError::Send)?;

    let status = response.status();
    if !status.is_success() {
        return Err(RequestError::Status(status));
    }

    response.json::<serde_json::Value>().await.map_err(RequestError::Json)
}
