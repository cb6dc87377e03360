//! Shape, length and charset rules for inbound read and write requests.
//!
//! Both validators are pure: they run before any store interaction so a
//! rejected request never has side effects.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{Error, TrackPayload};

const SUBJECT_ID_MIN_LEN: usize = 4;
const SUBJECT_ID_MAX_LEN: usize = 15;
const ACTION_MIN_LEN: usize = 4;
const ACTION_MAX_LEN: usize = 15;
const SUBJECT_ID_FORBIDDEN: char = ':';
const READ_SUBJECT_ID_MIN_LEN: usize = 2;

/// Path or query parameters of a read request.
pub type ReadParams = BTreeMap<String, String>;

/// Subject identifier accepted by the read paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectId(String);

impl SubjectId {
    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate a raw `POST /tracks` body and extract its fields.
///
/// The body must be a JSON object where:
/// - `uid` is a string of 4 to 15 characters without `:`;
/// - `action` is a string of 4 to 15 word characters (`[A-Za-z0-9_]`);
/// - `data.id` is a non-empty string or a number.
///
/// Violating any clause yields one aggregated
/// [`crate::domain::ErrorCode::InvalidPayload`] error whose message embeds
/// the serialised payload.
///
/// # Errors
/// Returns an invalid payload error when the body is empty, unparsable or
/// breaks a rule above.
///
/// # Examples
/// ```
/// use tracker::domain::validate_write_request;
///
/// assert!(validate_write_request(br#"{"uid":"12345","action":"fakeAction","data":{"id":"x"}}"#).is_ok());
/// assert!(validate_write_request(br#"{"uid":"1:345","action":"fakeAction","data":{"id":"x"}}"#).is_err());
/// ```
pub fn validate_write_request(body: &[u8]) -> Result<TrackPayload, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::invalid_payload("Missing post data"));
    }
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| Error::invalid_payload(format!("Unparsable post data: {err}")))?;

    extract_payload(&value).ok_or_else(|| {
        Error::invalid_payload(format!("Invalid post data {value}"))
    })
}

fn extract_payload(value: &Value) -> Option<TrackPayload> {
    let object = value.as_object()?;
    let subject_id = object.get("uid")?.as_str().filter(|uid| is_valid_subject_id(uid))?;
    let action = object.get("action")?.as_str().filter(|action| is_valid_action(action))?;
    let data = object.get("data")?.as_object()?;
    let item_id = item_id(data)?;

    Some(TrackPayload {
        subject_id: subject_id.to_owned(),
        action: action.to_owned(),
        item_id,
        data: data.clone(),
        site: optional_text(object.get("site")),
        url: optional_text(object.get("url")),
        referrer: optional_text(object.get("referrer")),
    })
}

fn is_valid_subject_id(uid: &str) -> bool {
    (SUBJECT_ID_MIN_LEN..=SUBJECT_ID_MAX_LEN).contains(&uid.chars().count())
        && !uid.contains(SUBJECT_ID_FORBIDDEN)
}

fn is_valid_action(action: &str) -> bool {
    (ACTION_MIN_LEN..=ACTION_MAX_LEN).contains(&action.len())
        && action
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn item_id(data: &Map<String, Value>) -> Option<String> {
    match data.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) if id.as_f64() != Some(0.0) => Some(id.to_string()),
        _ => None,
    }
}

/// Optional text fields treat empty strings and `null` as absent.
fn optional_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Validate the parameters of a subject read request.
///
/// # Errors
/// Returns an invalid payload error when `params` is absent, carries no
/// `uid`, or the `uid` is shorter than two characters.
///
/// # Examples
/// ```
/// use tracker::domain::{ReadParams, validate_read_request};
///
/// let params = ReadParams::from([("uid".to_owned(), "1234".to_owned())]);
/// assert_eq!(validate_read_request(Some(&params)).expect("valid").as_str(), "1234");
/// assert!(validate_read_request(None).is_err());
/// ```
pub fn validate_read_request(params: Option<&ReadParams>) -> Result<SubjectId, Error> {
    let params = params.ok_or_else(|| Error::invalid_payload("Missing get params"))?;
    match params.get("uid") {
        Some(uid) if uid.chars().count() >= READ_SUBJECT_ID_MIN_LEN => Ok(SubjectId(uid.clone())),
        _ => {
            let serialised = serde_json::to_string(params).unwrap_or_default();
            Err(Error::invalid_payload(format!(
                "Missing uid param {serialised}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;
    use serde_json::json;

    fn validate(body: &Value) -> Result<TrackPayload, Error> {
        validate_write_request(body.to_string().as_bytes())
    }

    #[rstest]
    #[case("1234", "abcd")]
    #[case("123456789012345", "abcdefghijklmno")]
    #[case("user-\u{e9}t\u{e9}", "object_Visit9")]
    fn accepts_boundary_values(#[case] uid: &str, #[case] action: &str) {
        let payload = validate(&json!({"uid": uid, "action": action, "data": {"id": "x"}}))
            .expect("payload accepted");
        assert_eq!(payload.subject_id(), uid);
        assert_eq!(payload.action(), action);
    }

    #[rstest]
    fn accepts_numeric_item_id() {
        let payload = validate(&json!({"uid": "12345", "action": "fakeAction", "data": {"id": 42}}))
            .expect("payload accepted");
        assert_eq!(payload.item_id, "42");
    }

    #[rstest]
    #[case::uid_too_short(json!({"uid": "123", "action": "fakeAction", "data": {"id": "x"}}))]
    #[case::uid_too_long(json!({"uid": "1234567890123456", "action": "fakeAction", "data": {"id": "x"}}))]
    #[case::uid_with_colon(json!({"uid": "12:45", "action": "fakeAction", "data": {"id": "x"}}))]
    #[case::uid_missing(json!({"action": "fakeAction", "data": {"id": "x"}}))]
    #[case::uid_not_string(json!({"uid": 12345, "action": "fakeAction", "data": {"id": "x"}}))]
    #[case::action_too_short(json!({"uid": "12345", "action": "abc", "data": {"id": "x"}}))]
    #[case::action_too_long(json!({"uid": "12345", "action": "abcdefghijklmnop", "data": {"id": "x"}}))]
    #[case::action_non_word(json!({"uid": "12345", "action": "fake-action", "data": {"id": "x"}}))]
    #[case::action_missing(json!({"uid": "12345", "data": {"id": "x"}}))]
    #[case::data_missing(json!({"uid": "12345", "action": "fakeAction"}))]
    #[case::id_missing(json!({"uid": "12345", "action": "fakeAction", "data": {}}))]
    #[case::id_empty(json!({"uid": "12345", "action": "fakeAction", "data": {"id": ""}}))]
    #[case::not_an_object(json!(["12345"]))]
    fn rejects_single_clause_violations(#[case] body: Value) {
        let err = validate(&body).expect_err("payload rejected");
        assert_eq!(err.code(), ErrorCode::InvalidPayload);
        assert_eq!(err.message(), format!("Invalid post data {body}"));
    }

    #[rstest]
    #[case(b"".as_slice())]
    #[case(b"  \n".as_slice())]
    fn rejects_missing_body(#[case] body: &[u8]) {
        let err = validate_write_request(body).expect_err("missing body rejected");
        assert_eq!(err.message(), "Missing post data");
    }

    #[rstest]
    fn rejects_unparsable_body() {
        let err = validate_write_request(b"{not json").expect_err("unparsable rejected");
        assert_eq!(err.code(), ErrorCode::InvalidPayload);
        assert!(err.message().starts_with("Unparsable post data"));
    }

    #[rstest]
    fn empty_optional_fields_are_absent() {
        let payload = validate(&json!({
            "uid": "12345", "action": "fakeAction", "data": {"id": "x"},
            "site": "", "url": null, "referrer": "ref"
        }))
        .expect("payload accepted");
        assert_eq!(payload.site, None);
        assert_eq!(payload.url, None);
        assert_eq!(payload.referrer.as_deref(), Some("ref"));
    }

    #[rstest]
    fn read_accepts_two_characters() {
        let params = ReadParams::from([("uid".to_owned(), "ab".to_owned())]);
        let subject = validate_read_request(Some(&params)).expect("valid");
        assert_eq!(subject.to_string(), "ab");
    }

    #[rstest]
    fn read_rejects_missing_params() {
        let err = validate_read_request(None).expect_err("rejected");
        assert_eq!(err.message(), "Missing get params");
    }

    #[rstest]
    #[case(ReadParams::from([("fake".to_owned(), "param".to_owned())]), r#"Missing uid param {"fake":"param"}"#)]
    #[case(ReadParams::from([("uid".to_owned(), "a".to_owned())]), r#"Missing uid param {"uid":"a"}"#)]
    #[case(ReadParams::from([("uid".to_owned(), String::new())]), r#"Missing uid param {"uid":""}"#)]
    fn read_rejects_missing_or_short_uid(#[case] params: ReadParams, #[case] expected: &str) {
        let err = validate_read_request(Some(&params)).expect_err("rejected");
        assert_eq!(err.code(), ErrorCode::InvalidPayload);
        assert_eq!(err.message(), expected);
    }
}
