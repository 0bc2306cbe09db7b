use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use super::*;

fn create_test_service() -> JwtService {
    JwtService::new(JwtConfig {
        secret: "test-secret-key-for-testing".to_string(),
        ..JwtConfig::default()
    })
}

#[test]
fn test_generate_and_validate_token() {
    let service = create_test_service();
    let user_id = Uuid::new_v4();

    let token = service
        .generate_access_token(user_id, Some("FINANCE_ADMIN"))
        .unwrap();
    let claims = service.validate_token(&token).unwrap();

    assert_eq!(claims.user_id(), user_id);
    assert_eq!(claims.role.as_deref(), Some("FINANCE_ADMIN"));
    assert_eq!(claims.iss, "coreops");
    assert_eq!(claims.aud, "coreops-web");
}

#[test]
fn test_authenticate_builds_context() {
    let service = create_test_service();
    let user_id = Uuid::new_v4();
    let token = service.generate_access_token(user_id, None).unwrap();

    let ctx = service.authenticate(&token).unwrap();

    assert_eq!(ctx.user_id.into_inner(), user_id);
    assert_eq!(ctx.role(), None);
}

#[test]
fn test_invalid_token() {
    let service = create_test_service();
    let result = service.validate_token("invalid.token.here");
    assert!(matches!(result, Err(JwtError::DecodingError(_))));
}

#[test]
fn test_token_signed_with_other_secret_is_rejected() {
    let other = JwtService::new(JwtConfig {
        secret: "a-different-secret".to_string(),
        ..JwtConfig::default()
    });
    let token = other.generate_access_token(Uuid::new_v4(), None).unwrap();

    assert!(create_test_service().validate_token(&token).is_err());
}

#[test]
fn test_expired_token() {
    let service = create_test_service();
    let expired = Claims::new(
        Uuid::new_v4(),
        None,
        "coreops",
        "coreops-web",
        Utc::now() - Duration::hours(1),
    );
    let token = encode(
        &Header::default(),
        &expired,
        &EncodingKey::from_secret(b"test-secret-key-for-testing"),
    )
    .unwrap();

    assert!(matches!(
        service.validate_token(&token),
        Err(JwtError::Expired)
    ));
}

#[test]
fn test_wrong_audience_is_rejected() {
    let service = create_test_service();
    let claims = Claims::new(
        Uuid::new_v4(),
        None,
        "coreops",
        "some-other-app",
        Utc::now() + Duration::hours(1),
    );
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-secret-key-for-testing"),
    )
    .unwrap();

    assert!(service.validate_token(&token).is_err());
}

#[test]
fn test_jwt_errors_map_to_unauthorized() {
    let expired: AppError = JwtError::Expired.into();
    assert_eq!(expired.status_code(), 401);
    assert_eq!(expired.public_message(), "Token has expired");

    let invalid: AppError = JwtError::DecodingError("bad".into()).into();
    assert_eq!(invalid.status_code(), 401);
}

#[test]
fn test_debug_hides_keys() {
    let debug = format!("{:?}", create_test_service());
    assert!(debug.contains("[hidden]"));
    assert!(!debug.contains("test-secret-key-for-testing"));
}
