//! Tests for the domain error payload.

use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case(Error::unauthenticated("sign in"), ErrorCode::Unauthenticated)]
#[case(Error::unauthorized("not yours"), ErrorCode::Unauthorized)]
#[case(Error::not_found("missing"), ErrorCode::NotFound)]
#[case(Error::target_not_found("no zine"), ErrorCode::TargetNotFound)]
#[case(Error::backend_unavailable("offline"), ErrorCode::BackendUnavailable)]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
fn constructors_set_code(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn display_uses_message() {
    let error = Error::unauthorized("only the artist can delete this zine");
    assert_eq!(error.to_string(), "only the artist can delete this zine");
}

#[rstest]
fn serialises_code_in_snake_case_and_omits_missing_details() {
    let value = serde_json::to_value(Error::target_not_found("zine missing"))
        .expect("error serialises");
    assert_eq!(
        value,
        json!({ "code": "target_not_found", "message": "zine missing" })
    );
}

#[rstest]
fn deserialise_round_trips_details() {
    let payload = json!({
        "code": "not_found",
        "message": "zine not found",
        "details": { "zineId": "z1" },
    });
    let error: Error = serde_json::from_value(payload).expect("payload is valid");
    assert_eq!(error.code(), ErrorCode::NotFound);
    assert_eq!(error.details(), Some(&json!({ "zineId": "z1" })));
}

#[rstest]
fn deserialise_rejects_blank_message() {
    let payload = json!({ "code": "internal_error", "message": "  " });
    let result: Result<Error, _> = serde_json::from_value(payload);
    assert!(result.is_err());
}

#[rstest]
fn value_validation_errors_become_invalid_requests() {
    let from_id: Error = crate::domain::ZineId::new("").expect_err("blank id").into();
    assert_eq!(from_id.code(), ErrorCode::InvalidRequest);

    let from_asset: Error = crate::domain::FlowerAsset::new(9)
        .expect_err("out of range")
        .into();
    assert_eq!(from_asset.code(), ErrorCode::InvalidRequest);
}
