//! JSON shapes exchanged with the content API.

use confpub_types::{ContentId, RemoteAttachment, RemotePage, RemotePageContent};
use serde::{Deserialize, Serialize};

/// `{ "results": [...], "size": N }` envelope used by searches and listings.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultsEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub size: Option<usize>,
}

impl<T> ResultsEnvelope<T> {
    /// Wraps results, reporting their count as the size.
    pub fn from_results(results: Vec<T>) -> Self {
        let size = Some(results.len());
        Self { results, size }
    }

    /// Number of results the server says this batch holds.
    ///
    /// Falls back to the number of decoded results when `size` is absent.
    pub fn reported_size(&self) -> usize {
        self.size.unwrap_or(self.results.len())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedContent {
    pub id: ContentId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionJson {
    pub number: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageJson {
    pub id: ContentId,
    pub title: String,
    #[serde(default)]
    pub version: Option<VersionJson>,
}

impl From<PageJson> for RemotePage {
    fn from(page: PageJson) -> Self {
        RemotePage {
            id: page.id,
            title: page.title,
            version: page.version.map_or(1, |v| v.number),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BodyValueJson {
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BodyJson {
    #[serde(default)]
    pub view: Option<BodyValueJson>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AncestorJson {
    pub id: ContentId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageWithBodyJson {
    pub id: ContentId,
    pub title: String,
    #[serde(default)]
    pub body: BodyJson,
    pub version: VersionJson,
    #[serde(default)]
    pub ancestors: Vec<AncestorJson>,
}

impl From<PageWithBodyJson> for RemotePageContent {
    fn from(page: PageWithBodyJson) -> Self {
        RemotePageContent {
            id: page.id,
            title: page.title,
            body: page.body.view.map(|b| b.value).unwrap_or_default(),
            version: page.version.number,
            // Ancestors are listed root first; the last one is the parent.
            parent_id: page.ancestors.into_iter().last().map(|a| a.id),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LinksJson {
    #[serde(default)]
    pub download: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttachmentJson {
    pub id: ContentId,
    pub title: String,
    #[serde(default)]
    pub version: Option<VersionJson>,
    #[serde(rename = "_links", default)]
    pub links: LinksJson,
}

impl From<AttachmentJson> for RemoteAttachment {
    fn from(attachment: AttachmentJson) -> Self {
        RemoteAttachment {
            id: attachment.id,
            file_name: attachment.title,
            download_link: attachment.links.download,
            version: attachment.version.map_or(1, |v| v.number),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PropertyJson {
    pub value: serde_json::Value,
}

impl PropertyJson {
    /// Property values are written as strings; anything else is returned as
    /// its JSON text.
    pub fn into_string(self) -> String {
        match self.value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LabelJson {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LabelPayload<'a> {
    pub prefix: &'static str,
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PropertyPayload<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_size_prefers_size_field() {
        let envelope: ResultsEnvelope<PageJson> =
            serde_json::from_str(r#"{"results": [], "size": 2}"#).unwrap();
        assert_eq!(envelope.reported_size(), 2);
    }

    #[test]
    fn reported_size_falls_back_to_result_count() {
        let envelope: ResultsEnvelope<LabelJson> =
            serde_json::from_str(r#"{"results": [{"prefix": "global", "name": "a"}]}"#).unwrap();
        assert_eq!(envelope.reported_size(), 1);
    }

    #[test]
    fn page_content_takes_last_ancestor_as_parent() {
        let json = r#"{
            "id": "42", "title": "Page",
            "body": {"view": {"value": "<p>hi</p>"}},
            "version": {"number": 3},
            "ancestors": [{"id": "1"}, {"id": "7"}]
        }"#;
        let page: RemotePageContent = serde_json::from_str::<PageWithBodyJson>(json).unwrap().into();
        assert_eq!(page.parent_id, Some(ContentId::from("7")));
        assert_eq!(page.body, "<p>hi</p>");
        assert_eq!(page.next_version(), 4);
    }

    #[test]
    fn attachment_maps_title_and_download_link() {
        let json = r#"{
            "id": "att1", "title": "diagram.png",
            "version": {"number": 2},
            "_links": {"download": "/download/attachments/1/diagram.png"}
        }"#;
        let att: RemoteAttachment = serde_json::from_str::<AttachmentJson>(json).unwrap().into();
        assert_eq!(att.file_name, "diagram.png");
        assert_eq!(att.download_link, "/download/attachments/1/diagram.png");
        assert_eq!(att.version, 2);
    }

    #[test]
    fn non_string_property_value_is_kept_as_json() {
        let prop: PropertyJson = serde_json::from_str(r#"{"value": {"a": 1}}"#).unwrap();
        assert_eq!(prop.into_string(), r#"{"a":1}"#);
    }
}
