use chrono::Utc;

use super::*;

const TEN_MINUTES_MS: i64 = 10 * 60 * 1000;

fn service() -> CapabilityService {
    CapabilityService::new("capability-test-secret")
}

fn issue_for(actor: Option<UserId>, expires_at_ms: i64) -> String {
    service()
        .issue(
            "audit_log_2026_10_2c4f.csv",
            "audit_log_2026_10_2c4f.csv",
            expires_at_ms,
            actor,
        )
        .unwrap()
}

fn status_of(err: CapabilityError) -> u16 {
    AppError::from(err).status_code()
}

#[test]
fn test_round_trip_returns_payload() {
    let actor = UserId::new();
    let now = Utc::now().timestamp_millis();
    let token = issue_for(Some(actor), now + TEN_MINUTES_MS);

    let grant = service().verify(&token, Some(actor)).unwrap();

    assert_eq!(grant.rel_path, "audit_log_2026_10_2c4f.csv");
    assert_eq!(grant.file_name, "audit_log_2026_10_2c4f.csv");
    assert_eq!(grant.expires_at_ms, now + TEN_MINUTES_MS);
}

#[test]
fn test_token_is_three_segment_jws() {
    let token = issue_for(None, Utc::now().timestamp_millis() + TEN_MINUTES_MS);
    assert_eq!(token.split('.').count(), 3);
}

#[test]
fn test_expired_token_is_forbidden() {
    let actor = UserId::new();
    let issued_at = 1_700_000_000_000;
    let token = issue_for(Some(actor), issued_at + TEN_MINUTES_MS);

    assert!(
        service()
            .verify_at(&token, Some(actor), issued_at + TEN_MINUTES_MS)
            .is_ok()
    );

    let err = service()
        .verify_at(&token, Some(actor), issued_at + TEN_MINUTES_MS + 1)
        .unwrap_err();
    assert_eq!(err, CapabilityError::Expired);
    assert_eq!(status_of(err), 403);
}

#[test]
fn test_flipping_any_signature_byte_is_forbidden() {
    let actor = UserId::new();
    let token = issue_for(Some(actor), Utc::now().timestamp_millis() + TEN_MINUTES_MS);
    let sig_start = token.rfind('.').unwrap() + 1;

    for index in sig_start..token.len() {
        let mut bytes = token.clone().into_bytes();
        bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        let err = service().verify(&tampered, Some(actor)).unwrap_err();
        assert_eq!(status_of(err), 403, "byte {index} accepted after flip");
    }
}

#[test]
fn test_tampered_payload_fails_signature() {
    let actor = UserId::new();
    let token = issue_for(Some(actor), Utc::now().timestamp_millis() + TEN_MINUTES_MS);
    let other = service()
        .issue(
            "../../etc/passwd",
            "passwd",
            Utc::now().timestamp_millis() + TEN_MINUTES_MS,
            Some(actor),
        )
        .unwrap();

    let parts: Vec<&str> = token.split('.').collect();
    let other_parts: Vec<&str> = other.split('.').collect();
    let spliced = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

    assert_eq!(
        service().verify(&spliced, Some(actor)).unwrap_err(),
        CapabilityError::BadSignature
    );
}

#[test]
fn test_other_actor_is_forbidden() {
    let token = issue_for(
        Some(UserId::new()),
        Utc::now().timestamp_millis() + TEN_MINUTES_MS,
    );

    let err = service().verify(&token, Some(UserId::new())).unwrap_err();
    assert_eq!(err, CapabilityError::ActorMismatch);
    assert_eq!(status_of(err), 403);
}

#[test]
fn test_unbound_token_accepts_any_actor() {
    let token = issue_for(None, Utc::now().timestamp_millis() + TEN_MINUTES_MS);
    assert!(service().verify(&token, Some(UserId::new())).is_ok());
}

#[test]
fn test_other_secret_is_forbidden() {
    let token = issue_for(None, Utc::now().timestamp_millis() + TEN_MINUTES_MS);
    let err = CapabilityService::new("another-secret")
        .verify(&token, None)
        .unwrap_err();
    assert_eq!(err, CapabilityError::BadSignature);
}

#[test]
fn test_garbage_is_malformed() {
    assert_eq!(
        service().verify("not-a-token", None).unwrap_err(),
        CapabilityError::Malformed
    );
    assert_eq!(status_of(CapabilityError::Malformed), 403);
}

#[test]
fn test_access_token_is_not_a_capability() {
    let jwt = crate::jwt::JwtService::new(crate::jwt::JwtConfig {
        secret: "capability-test-secret".to_string(),
        ..crate::jwt::JwtConfig::default()
    });
    let access = jwt.generate_access_token(Uuid::new_v4(), None).unwrap();

    assert_eq!(
        service().verify(&access, None).unwrap_err(),
        CapabilityError::Malformed
    );
}
