use secrecy::SecretString;

use crate::{jwt::TokenSigner, use_cases::sso::LocalPrincipal};

/// Signer with a fixed secret so tests can mint and verify tokens.
pub fn test_signer() -> TokenSigner {
    TokenSigner::new(
        SecretString::new("a-test-secret-that-is-long-enough".into()),
        "https://id.example.com".into(),
    )
}

pub fn test_principal() -> LocalPrincipal {
    LocalPrincipal {
        email: "host-user@example.com".into(),
        display_name: Some("Host User".into()),
    }
}
