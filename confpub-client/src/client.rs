//! REST implementation of [`ContentApi`].

use crate::api::{ContentApi, PageContent, PageCursor};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, LookupKey};
use crate::gate::RateGate;
use crate::resolver::resolve_single;
use crate::transport::HttpTransport;
use crate::wire::{
    AttachmentJson, CreatedContent, LabelJson, LabelPayload, PageJson, PageWithBodyJson,
    PropertyJson, PropertyPayload, ResultsEnvelope,
};
use async_trait::async_trait;
use confpub_types::{ContentId, RemoteAttachment, RemotePage, RemotePageContent};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

const CONTENT_PATH: &str = "/rest/api/content";

/// Default upper bound on batches per listing. A server that keeps returning
/// full batches past this point is treated as broken.
pub const DEFAULT_MAX_LISTING_BATCHES: usize = 10_000;

/// Label prefix used for every label this client writes.
const LABEL_PREFIX: &str = "global";

/// Client for the `/rest/api/content` resource family.
#[derive(Debug, Clone)]
pub struct RestContentClient {
    transport: HttpTransport,
    page_limit: usize,
    max_listing_batches: usize,
}

impl RestContentClient {
    /// Creates a client over an existing transport.
    pub fn new(transport: HttpTransport, page_limit: usize) -> ClientResult<Self> {
        if page_limit == 0 {
            return Err(ClientError::Config(
                "page limit must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            transport,
            page_limit,
            max_listing_batches: DEFAULT_MAX_LISTING_BATCHES,
        })
    }

    /// Caps the number of batches one listing may fetch before it fails
    /// with [`ClientError::UnboundedListing`]. Values below one are raised
    /// to one.
    pub fn with_max_listing_batches(mut self, max_batches: usize) -> Self {
        self.max_listing_batches = max_batches.max(1);
        self
    }

    /// Creates the transport and client from configuration.
    pub fn from_config(config: &ClientConfig, gate: Arc<RateGate>) -> ClientResult<Self> {
        let transport = HttpTransport::from_config(config, gate)?;
        Self::new(transport, config.page_limit)
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    /// Fetches every batch of a listing and returns the items in request
    /// order.
    ///
    /// A batch whose reported size is below the limit is the last one, so a
    /// total that is an exact multiple of the limit costs one extra request.
    async fn paginate<J, T>(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<Vec<T>>
    where
        J: DeserializeOwned,
        T: From<J>,
    {
        let mut items = Vec::new();
        let mut cursor = PageCursor::first(self.page_limit);

        for _ in 0..self.max_listing_batches {
            let response = self
                .transport
                .send(
                    Method::GET,
                    path,
                    |request| {
                        request
                            .query(query)
                            .query(&[("start", cursor.start), ("limit", cursor.limit)])
                    },
                    &[],
                )
                .await?;
            let envelope: ResultsEnvelope<J> = response.json()?;
            let reported = envelope.reported_size();
            items.extend(envelope.results.into_iter().map(T::from));

            if !cursor.has_more(reported) {
                debug!("Listed {} items from {}", items.len(), path);
                return Ok(items);
            }
            cursor = cursor.next();
        }

        Err(ClientError::UnboundedListing {
            request: format!("GET {}{}", self.transport.root_url(), path),
            batches: self.max_listing_batches,
        })
    }

    async fn delete_content(&self, content_id: &ContentId) -> ClientResult<()> {
        let response = self
            .transport
            .send(
                Method::DELETE,
                &content_path(content_id),
                |request| request,
                &[StatusCode::NOT_FOUND],
            )
            .await?;
        if response.status == StatusCode::NOT_FOUND {
            debug!("Content {} already absent", content_id);
        }
        Ok(())
    }
}

fn content_path(content_id: &ContentId) -> String {
    format!("{CONTENT_PATH}/{}", urlencoding::encode(content_id.as_str()))
}

fn body_json(content: &PageContent<'_>) -> Value {
    json!({
        "storage": {
            "value": content.body,
            "representation": content.content_type.representation(),
        }
    })
}

fn attachment_part(file_name: &str, content: Vec<u8>) -> Part {
    Part::bytes(content).file_name(file_name.to_string())
}

#[async_trait]
impl ContentApi for RestContentClient {
    async fn add_page_under_ancestor(
        &self,
        space_key: &str,
        ancestor_id: &ContentId,
        content: PageContent<'_>,
        version_message: &str,
    ) -> ClientResult<ContentId> {
        let payload = json!({
            "type": "page",
            "title": content.title,
            "space": { "key": space_key },
            "ancestors": [{ "id": ancestor_id }],
            "body": body_json(&content),
            "version": { "message": version_message },
        });

        let response = self
            .transport
            .send(Method::POST, CONTENT_PATH, |request| request.json(&payload), &[])
            .await?;
        let created: CreatedContent = response.json()?;
        debug!("Created page '{}' as {}", content.title, created.id);
        Ok(created.id)
    }

    async fn update_page(
        &self,
        content_id: &ContentId,
        ancestor_id: Option<&ContentId>,
        content: PageContent<'_>,
        new_version: u32,
        version_message: &str,
        notify_watchers: bool,
    ) -> ClientResult<()> {
        let mut payload = json!({
            "id": content_id,
            "type": "page",
            "title": content.title,
            "body": body_json(&content),
            "version": {
                "number": new_version,
                "message": version_message,
                "minorEdit": !notify_watchers,
            },
        });
        if let Some(ancestor_id) = ancestor_id {
            payload["ancestors"] = json!([{ "id": ancestor_id }]);
        }

        self.transport
            .send(
                Method::PUT,
                &content_path(content_id),
                |request| request.json(&payload),
                &[],
            )
            .await?;
        debug!("Updated page {} to version {}", content_id, new_version);
        Ok(())
    }

    async fn delete_page(&self, content_id: &ContentId) -> ClientResult<()> {
        self.delete_content(content_id).await
    }

    async fn get_page_by_title(&self, space_key: &str, title: &str) -> ClientResult<ContentId> {
        let response = self
            .transport
            .send(
                Method::GET,
                CONTENT_PATH,
                |request| request.query(&[("spaceKey", space_key), ("title", title)]),
                &[],
            )
            .await?;
        let envelope: ResultsEnvelope<PageJson> = response.json()?;
        let key = LookupKey::PageTitle {
            space_key: space_key.to_string(),
            title: title.to_string(),
        };
        Ok(resolve_single(key, envelope)?.id)
    }

    async fn get_page_with_view_content(
        &self,
        content_id: &ContentId,
    ) -> ClientResult<RemotePageContent> {
        let response = self
            .transport
            .send(
                Method::GET,
                &content_path(content_id),
                |request| request.query(&[("expand", "body.view,version,ancestors")]),
                &[],
            )
            .await?;
        Ok(response.json::<PageWithBodyJson>()?.into())
    }

    async fn get_child_pages(&self, content_id: &ContentId) -> ClientResult<Vec<RemotePage>> {
        let path = format!("{}/child/page", content_path(content_id));
        self.paginate::<PageJson, RemotePage>(&path, &[("expand", "version")])
            .await
    }

    async fn get_attachments(
        &self,
        content_id: &ContentId,
    ) -> ClientResult<Vec<RemoteAttachment>> {
        let path = format!("{}/child/attachment", content_path(content_id));
        self.paginate::<AttachmentJson, RemoteAttachment>(&path, &[("expand", "version")])
            .await
    }

    async fn get_attachment_by_file_name(
        &self,
        content_id: &ContentId,
        file_name: &str,
    ) -> ClientResult<RemoteAttachment> {
        let path = format!("{}/child/attachment", content_path(content_id));
        let response = self
            .transport
            .send(
                Method::GET,
                &path,
                |request| request.query(&[("filename", file_name), ("expand", "version")]),
                &[],
            )
            .await?;
        let envelope: ResultsEnvelope<AttachmentJson> = response.json()?;
        let key = LookupKey::AttachmentFileName {
            content_id: content_id.clone(),
            file_name: file_name.to_string(),
        };
        Ok(resolve_single(key, envelope)?.into())
    }

    async fn add_attachment(
        &self,
        content_id: &ContentId,
        file_name: &str,
        content: Vec<u8>,
    ) -> ClientResult<()> {
        let path = format!("{}/child/attachment", content_path(content_id));
        let form = Form::new().part("file", attachment_part(file_name, content));
        self.transport
            .send(
                Method::POST,
                &path,
                |request| request.header("X-Atlassian-Token", "no-check").multipart(form),
                &[],
            )
            .await?;
        debug!("Added attachment '{}' to {}", file_name, content_id);
        Ok(())
    }

    async fn update_attachment_content(
        &self,
        content_id: &ContentId,
        attachment: &RemoteAttachment,
        content: Vec<u8>,
        notify_watchers: bool,
    ) -> ClientResult<()> {
        let path = format!(
            "{}/child/attachment/{}/data",
            content_path(content_id),
            urlencoding::encode(attachment.id.as_str())
        );
        let form = Form::new()
            .part("file", attachment_part(&attachment.file_name, content))
            .text("minorEdit", (!notify_watchers).to_string());
        self.transport
            .send(
                Method::POST,
                &path,
                |request| request.header("X-Atlassian-Token", "no-check").multipart(form),
                &[],
            )
            .await?;
        debug!(
            "Updated attachment '{}' of {}",
            attachment.file_name, content_id
        );
        Ok(())
    }

    async fn delete_attachment(&self, attachment_id: &ContentId) -> ClientResult<()> {
        self.delete_content(attachment_id).await
    }

    async fn get_property_by_key(
        &self,
        content_id: &ContentId,
        key: &str,
    ) -> ClientResult<Option<String>> {
        let path = format!(
            "{}/property/{}",
            content_path(content_id),
            urlencoding::encode(key)
        );
        let response = self
            .transport
            .send(Method::GET, &path, |request| request, &[StatusCode::NOT_FOUND])
            .await?;
        if response.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.json::<PropertyJson>()?.into_string()))
    }

    async fn set_property_by_key(
        &self,
        content_id: &ContentId,
        key: &str,
        value: &str,
    ) -> ClientResult<()> {
        let path = format!("{}/property", content_path(content_id));
        let payload = PropertyPayload { key, value };
        self.transport
            .send(Method::POST, &path, |request| request.json(&payload), &[])
            .await?;
        Ok(())
    }

    async fn delete_property_by_key(&self, content_id: &ContentId, key: &str) -> ClientResult<()> {
        let path = format!(
            "{}/property/{}",
            content_path(content_id),
            urlencoding::encode(key)
        );
        let response = self
            .transport
            .send(Method::DELETE, &path, |request| request, &[StatusCode::FORBIDDEN])
            .await?;
        if response.status == StatusCode::FORBIDDEN {
            warn!(
                "Deleting property '{}' of {} was forbidden; treating it as absent",
                key, content_id
            );
        }
        Ok(())
    }

    async fn get_labels(&self, content_id: &ContentId) -> ClientResult<Vec<String>> {
        let path = format!("{}/label", content_path(content_id));
        let labels = self.paginate::<LabelJson, LabelJson>(&path, &[]).await?;
        Ok(labels.into_iter().map(|label| label.name).collect())
    }

    async fn add_labels(&self, content_id: &ContentId, labels: &[String]) -> ClientResult<()> {
        if labels.is_empty() {
            return Ok(());
        }
        let path = format!("{}/label", content_path(content_id));
        let payload: Vec<LabelPayload<'_>> = labels
            .iter()
            .map(|name| LabelPayload {
                prefix: LABEL_PREFIX,
                name,
            })
            .collect();
        self.transport
            .send(Method::POST, &path, |request| request.json(&payload), &[])
            .await?;
        Ok(())
    }

    async fn delete_label(&self, content_id: &ContentId, label: &str) -> ClientResult<()> {
        let path = format!("{}/label", content_path(content_id));
        self.transport
            .send(
                Method::DELETE,
                &path,
                |request| request.query(&[("name", label)]),
                &[],
            )
            .await?;
        Ok(())
    }
}
