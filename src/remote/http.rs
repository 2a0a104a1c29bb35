//! HTTP client for the Garden Log document store.
//!
//! Endpoints, relative to the configured base URL:
//!
//! - `GET /v1/{collection}?userId=&offset=&limit=` lists documents
//! - `GET /v1/{collection}/{id}?userId=` fetches one document
//! - `POST /v1/{collection}` inserts a document and answers `{"id": ...}`
//! - `PATCH /v1/{collection}/{id}` updates fields, 404 if the document is gone
//! - `DELETE /v1/{collection}/{id}?userId=` removes a document

use async_trait::async_trait;
use garden_core::sync::{
    Fields, PageRequest, RemoteDocument, RemoteError, RemoteStore, OWNER_FIELD,
};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct InsertResponse {
    id: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/{}",
            self.base_url,
            urlencoding::encode(collection)
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(collection),
            urlencoding::encode(id)
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        self.authorized(request)
            .send()
            .await
            .map_err(|e| RemoteError::Connection(e.to_string()))
    }
}

/// Maps an unsuccessful response to a remote error.
async fn failure(response: Response) -> RemoteError {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = body["message"]
        .as_str()
        .or_else(|| body["error"].as_str())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error"))
        .to_string();
    classify(status, message)
}

fn classify(status: StatusCode, message: String) -> RemoteError {
    match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound,
        StatusCode::BAD_REQUEST
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::UNPROCESSABLE_ENTITY => {
            RemoteError::Rejected(format!("{}: {}", status.as_u16(), message))
        }
        _ => RemoteError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

fn invalid_response(e: reqwest::Error) -> RemoteError {
    RemoteError::InvalidResponse(e.to_string())
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list(
        &self,
        collection: &str,
        owner: &str,
        page: PageRequest,
    ) -> Result<Vec<RemoteDocument>, RemoteError> {
        let request = self.client.get(self.collection_url(collection)).query(&[
            (OWNER_FIELD, owner.to_string()),
            ("offset", page.offset.to_string()),
            ("limit", page.limit.to_string()),
        ]);

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(failure(response).await);
        }
        response.json().await.map_err(invalid_response)
    }

    async fn get(
        &self,
        collection: &str,
        owner: &str,
        id: &str,
    ) -> Result<Option<RemoteDocument>, RemoteError> {
        let request = self
            .client
            .get(self.document_url(collection, id))
            .query(&[(OWNER_FIELD, owner)]);

        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(failure(response).await);
        }
        response.json().await.map(Some).map_err(invalid_response)
    }

    async fn insert(
        &self,
        collection: &str,
        owner: &str,
        mut fields: Fields,
    ) -> Result<String, RemoteError> {
        fields.insert(OWNER_FIELD.to_string(), Value::String(owner.to_string()));
        let request = self
            .client
            .post(self.collection_url(collection))
            .json(&fields);

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(failure(response).await);
        }
        let inserted: InsertResponse = response.json().await.map_err(invalid_response)?;
        tracing::debug!(collection, id = %inserted.id, "Inserted remote document");
        Ok(inserted.id)
    }

    async fn update(
        &self,
        collection: &str,
        owner: &str,
        id: &str,
        mut fields: Fields,
    ) -> Result<(), RemoteError> {
        fields.insert(OWNER_FIELD.to_string(), Value::String(owner.to_string()));
        let request = self
            .client
            .patch(self.document_url(collection, id))
            .json(&fields);

        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(failure(response).await);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, owner: &str, id: &str) -> Result<(), RemoteError> {
        let request = self
            .client
            .delete(self.document_url(collection, id))
            .query(&[(OWNER_FIELD, owner)]);

        let response = self.send(request).await?;
        // Already gone counts as deleted.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(failure(response).await);
        }
        Ok(())
    }
}
