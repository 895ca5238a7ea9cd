// OAuth 1.0a request signing (HMAC-SHA1, RFC 5849 section 3.4).

use std::borrow::Cow;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use sha1::Sha1;
use url::Url;

use super::Token;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const VERSION: &str = "1.0";

/// Signs requests on behalf of one consumer (application).
#[derive(Clone)]
pub struct Signer {
    consumer_key: String,
    consumer_secret: String,
}

impl Signer {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Signer {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    /// Build the `Authorization` header value for a request.
    ///
    /// `form` holds the urlencoded body parameters (empty for GET),
    /// `token` the token in play if any, and `extra` flow-specific
    /// protocol parameters such as `oauth_callback` or `oauth_verifier`.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &Url,
        form: &[(&str, &str)],
        token: Option<&Token>,
        extra: &[(&str, &str)],
    ) -> String {
        self.authorization_header_with(method, url, form, token, extra, &nonce(), timestamp())
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn authorization_header_with(
        &self,
        method: &str,
        url: &Url,
        form: &[(&str, &str)],
        token: Option<&Token>,
        extra: &[(&str, &str)],
        nonce: &str,
        timestamp: u64,
    ) -> String {
        let mut oauth: Vec<(String, String)> = vec![
            ("oauth_consumer_key".into(), self.consumer_key.clone()),
            ("oauth_nonce".into(), nonce.to_string()),
            ("oauth_signature_method".into(), SIGNATURE_METHOD.into()),
            ("oauth_timestamp".into(), timestamp.to_string()),
            ("oauth_version".into(), VERSION.into()),
        ];
        if let Some(token) = token {
            oauth.push(("oauth_token".into(), token.token.clone()));
        }
        oauth.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let mut params = oauth.clone();
        params.extend(url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())));
        params.extend(form.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        let base = signature_base_string(method, url, &params);
        let token_secret = token.map(|t| t.secret.as_str()).unwrap_or("");
        let signature = sign(&base, &self.consumer_secret, token_secret);
        oauth.push(("oauth_signature".into(), signature));
        oauth.sort();

        let fields = oauth
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("OAuth {}", fields)
    }
}

/// RFC 3986 percent-encoding: only `A-Z a-z 0-9 - . _ ~` pass through.
pub fn encode(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

/// Signature base string: method, base URL and normalized parameters.
pub fn signature_base_string(method: &str, url: &Url, params: &[(String, String)]) -> String {
    let base_url = format!("{}{}", url.origin().ascii_serialization(), url.path());

    let mut pairs: Vec<(Cow<'_, str>, Cow<'_, str>)> =
        params.iter().map(|(k, v)| (encode(k), encode(v))).collect();
    pairs.sort();
    let normalized = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(&base_url),
        encode(&normalized)
    )
}

/// Base64 HMAC-SHA1 of the base string, keyed by both secrets.
pub fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(base.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
