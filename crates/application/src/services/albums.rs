//! Album endpoints.

use photox_domain::ApiRequest;
use serde_json::{Value, json};

use super::ListQuery;
use crate::client::ApiClient;
use crate::error::ClientResult;

const ALBUMS_PATH: &str = "/albums/";

fn album_path(id: u64) -> String {
    format!("{ALBUMS_PATH}{id}/")
}

/// Album CRUD and membership operations.
#[derive(Debug, Clone)]
pub struct AlbumService {
    client: ApiClient,
}

impl AlbumService {
    /// Creates the service.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Creates an album from `{title, description, is_public}`.
    ///
    /// # Errors
    ///
    /// Returns the client error if the request fails.
    pub async fn create(&self, payload: Value) -> ClientResult<Value> {
        self.send(ApiRequest::post(ALBUMS_PATH).json(payload)).await
    }

    /// Lists the current user's albums.
    ///
    /// # Errors
    ///
    /// Returns the client error if the request fails.
    pub async fn list(&self, query: &ListQuery) -> ClientResult<Value> {
        self.send(query.apply(ApiRequest::get(ALBUMS_PATH))).await
    }

    /// Fetches an album with its images.
    ///
    /// # Errors
    ///
    /// Returns the client error if the request fails.
    pub async fn get(&self, id: u64) -> ClientResult<Value> {
        self.send(ApiRequest::get(album_path(id))).await
    }

    /// Replaces an album's editable fields.
    ///
    /// # Errors
    ///
    /// Returns the client error if the request fails.
    pub async fn update(&self, id: u64, payload: Value) -> ClientResult<Value> {
        self.send(ApiRequest::put(album_path(id)).json(payload)).await
    }

    /// Deletes an album. The images it contains are kept.
    ///
    /// # Errors
    ///
    /// Returns the client error if the request fails.
    pub async fn delete(&self, id: u64) -> ClientResult<()> {
        self.client.request(ApiRequest::delete(album_path(id))).await?;
        Ok(())
    }

    /// Adds an existing image to an album.
    ///
    /// # Errors
    ///
    /// Returns the client error if the request fails.
    pub async fn add_image(&self, album_id: u64, image_id: u64) -> ClientResult<Value> {
        self.membership(album_id, "add_image", image_id).await
    }

    /// Removes an image from an album.
    ///
    /// # Errors
    ///
    /// Returns the client error if the request fails.
    pub async fn remove_image(&self, album_id: u64, image_id: u64) -> ClientResult<Value> {
        self.membership(album_id, "remove_image", image_id).await
    }

    async fn membership(&self, album_id: u64, action: &str, image_id: u64) -> ClientResult<Value> {
        let path = format!("{}{action}/", album_path(album_id));
        self.send(ApiRequest::post(path).json(json!({"image_id": image_id})))
            .await
    }

    async fn send(&self, request: ApiRequest) -> ClientResult<Value> {
        Ok(self.client.request(request).await?.data()?)
    }
}
