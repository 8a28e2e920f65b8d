//! Purpose: Speak the store's REST protocol: JSON envelopes over blocking HTTP.
//! Exports: `RestStore`.
//! Role: Production `StoreTransport`; mirrors the store's v1 endpoint layout.
//! Invariants: Cell values stay base64 end to end; this layer never decodes them.
//! Invariants: Store-side errors keep the kind reported by the error envelope.
#![allow(clippy::result_large_err)]

use crate::api::store::{RangeQuery, StoreTransport};
use crate::core::codec::WireRow;
use crate::core::error::{Error, ErrorKind};
use crate::core::mutation::RowMutation;
use crate::core::range::Direction;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

type ApiResult<T> = Result<T, Error>;

#[derive(Clone)]
pub struct RestStore {
    inner: Arc<RestStoreInner>,
}

struct RestStoreInner {
    base_url: Url,
    token: Option<String>,
    agent: ureq::Agent,
}

#[derive(Serialize)]
struct ScanBody<'a> {
    lower: Option<&'a str>,
    upper: Option<&'a str>,
    direction: &'static str,
    limit: Option<u32>,
    filter: Option<&'a Value>,
    columns: Option<&'a [String]>,
}

#[derive(Deserialize)]
struct ScanEnvelope {
    rows: Vec<WireRow>,
}

#[derive(Deserialize)]
struct RowEnvelope {
    row: WireRow,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: StoreErrorBody,
}

#[derive(Deserialize)]
struct StoreErrorBody {
    kind: String,
    message: Option<String>,
    hint: Option<String>,
    table: Option<String>,
    row: Option<String>,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self {
            inner: Arc::new(RestStoreInner {
                base_url,
                token: None,
                agent,
            }),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = Some(token.into());
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.token = token;
        } else {
            self.inner = Arc::new(RestStoreInner {
                base_url: self.inner.base_url.clone(),
                token,
                agent: self.inner.agent.clone(),
            });
        }
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn request(&self, method: &str, url: &Url) -> ureq::Request {
        let mut request = self.inner.agent.request(method, url.as_str());
        if let Some(token) = &self.inner.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        request
    }

    fn request_json<T, R>(&self, method: &str, url: &Url, body: &T) -> ApiResult<R>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let request = self.request(method, url).set("Accept", "application/json");
        let response = if method == "GET" {
            request.call()
        } else {
            let payload = serde_json::to_string(body).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to encode request json")
                    .with_source(err)
            })?;
            request
                .set("Content-Type", "application/json")
                .send_string(&payload)
        };

        match response {
            Ok(resp) => read_json_response(resp),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
                .with_message("request failed")
                .with_source(err)),
        }
    }
}

impl StoreTransport for RestStore {
    fn scan_range(&self, table: &str, query: &RangeQuery) -> ApiResult<Vec<WireRow>> {
        let url = build_url(&self.inner.base_url, &["v1", "tables", table, "scan"])?;
        let body = ScanBody {
            lower: query.lower.as_deref(),
            upper: query.upper.as_deref(),
            direction: direction_to_str(query.direction),
            limit: query.limit,
            filter: query.filter.as_ref(),
            columns: query.columns.as_deref(),
        };
        let envelope: ScanEnvelope = self
            .request_json("POST", &url, &body)
            .map_err(|err| err.with_table(table))?;
        Ok(envelope.rows)
    }

    fn fetch_row(
        &self,
        table: &str,
        rowkey: &str,
        columns: Option<&[String]>,
    ) -> ApiResult<Option<WireRow>> {
        let mut url = build_url(&self.inner.base_url, &["v1", "tables", table, "rows", rowkey])?;
        if let Some(columns) = columns {
            let mut pairs = url.query_pairs_mut();
            for column in columns {
                pairs.append_pair("column", column);
            }
        }
        match self.request_json::<(), RowEnvelope>("GET", &url, &()) {
            Ok(envelope) => Ok(Some(envelope.row)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.with_table(table).with_row(rowkey)),
        }
    }

    fn apply_mutation(&self, table: &str, mutation: &RowMutation) -> ApiResult<()> {
        let url = build_url(&self.inner.base_url, &["v1", "tables", table, "mutate"])?;
        let _ack: Value = self
            .request_json("POST", &url, mutation)
            .map_err(|err| err.with_table(table).with_row(mutation.row.clone()))?;
        Ok(())
    }
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid store base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(
            Error::new(ErrorKind::Usage).with_message("store base url must use http or https")
        );
    }
    if url.path() != "/" && !url.path().is_empty() {
        return Err(
            Error::new(ErrorKind::Usage).with_message("store base url must not include a path")
        );
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn build_url(base_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = base_url.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| Error::new(ErrorKind::Usage).with_message("base url cannot be a base"))?;
        path.clear();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

fn read_json_response<R>(response: ureq::Response) -> ApiResult<R>
where
    R: DeserializeOwned,
{
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("invalid response json")
            .with_source(err)
    })
}

fn parse_error_response(status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
        return error_from_envelope(envelope.error);
    }
    let kind = error_kind_from_status(status);
    Error::new(kind).with_message(format!("store error status {status}"))
}

fn error_from_envelope(body: StoreErrorBody) -> Error {
    let kind = parse_error_kind(&body.kind);
    let mut err = Error::new(kind);
    if let Some(message) = body.message {
        err = err.with_message(message);
    }
    if let Some(hint) = body.hint {
        err = err.with_hint(hint);
    }
    if let Some(table) = body.table {
        err = err.with_table(table);
    }
    if let Some(row) = body.row {
        err = err.with_row(row);
    }
    err
}

fn parse_error_kind(kind: &str) -> ErrorKind {
    match kind {
        "Internal" => ErrorKind::Internal,
        "Usage" => ErrorKind::Usage,
        "Codec" => ErrorKind::Codec,
        "Range" => ErrorKind::Range,
        "NotFound" => ErrorKind::NotFound,
        "Permission" => ErrorKind::Permission,
        "Io" => ErrorKind::Io,
        _ => ErrorKind::Internal,
    }
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 413 => ErrorKind::Usage,
        401 | 403 => ErrorKind::Permission,
        404 => ErrorKind::NotFound,
        422 => ErrorKind::Codec,
        500..=599 => ErrorKind::Internal,
        _ => ErrorKind::Io,
    }
}

fn direction_to_str(direction: Direction) -> &'static str {
    match direction {
        Direction::Ascending => "asc",
        Direction::Descending => "desc",
    }
}

#[cfg(test)]
mod tests {
    use super::{
        RestStore, build_url, direction_to_str, error_kind_from_status, normalize_base_url,
        parse_error_kind,
    };
    use crate::core::error::ErrorKind;
    use crate::core::range::Direction;

    #[test]
    fn normalize_base_url_strips_query_and_fragment() {
        let url = normalize_base_url("http://localhost:9090".to_string()).expect("url");
        assert_eq!(url.as_str(), "http://localhost:9090/");
    }

    #[test]
    fn normalize_base_url_rejects_path() {
        let err = normalize_base_url("http://localhost:9090/store".to_string()).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn normalize_base_url_rejects_other_schemes() {
        let err = normalize_base_url("ftp://localhost".to_string()).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn build_url_joins_and_escapes_segments() {
        let base = normalize_base_url("http://localhost:9090".to_string()).expect("url");
        let url = build_url(&base, &["v1", "tables", "ledger", "scan"]).expect("url");
        assert_eq!(url.as_str(), "http://localhost:9090/v1/tables/ledger/scan");

        let url = build_url(&base, &["v1", "tables", "ledger", "rows", "ROW 1"]).expect("url");
        assert_eq!(
            url.as_str(),
            "http://localhost:9090/v1/tables/ledger/rows/ROW%201"
        );
    }

    #[test]
    fn error_kind_from_status_maps_families() {
        assert_eq!(error_kind_from_status(400), ErrorKind::Usage);
        assert_eq!(error_kind_from_status(403), ErrorKind::Permission);
        assert_eq!(error_kind_from_status(404), ErrorKind::NotFound);
        assert_eq!(error_kind_from_status(422), ErrorKind::Codec);
        assert_eq!(error_kind_from_status(503), ErrorKind::Internal);
    }

    #[test]
    fn parse_error_kind_falls_back_to_internal() {
        assert_eq!(parse_error_kind("Range"), ErrorKind::Range);
        assert_eq!(parse_error_kind("whatever"), ErrorKind::Internal);
    }

    #[test]
    fn direction_wire_strings_are_stable() {
        assert_eq!(direction_to_str(Direction::Ascending), "asc");
        assert_eq!(direction_to_str(Direction::Descending), "desc");
    }

    #[test]
    fn rest_store_keeps_normalized_base_url() {
        let store = RestStore::new("https://store.example:8443").expect("store");
        assert_eq!(store.base_url().as_str(), "https://store.example:8443/");
    }
}
