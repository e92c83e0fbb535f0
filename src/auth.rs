use axum::http::{HeaderMap, header};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature";
pub const TIMESTAMP_HEADER: &str = "x-timestamp";
pub const SECRET_HEADER: &str = "x-geckogen-secret";

/// 签名时间戳允许的最大偏差（秒）
pub const MAX_CLOCK_SKEW_SECS: i64 = 5 * 60;

const SIGNATURE_PREFIX: &str = "sha256=";
const BEARER_SCHEME: &str = "bearer";

/// 认证成功时所使用的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `X-Signature` + `X-Timestamp` 的 HMAC 签名
    Signature,
    /// `X-GeckoGen-Secret` 明文密钥
    SharedSecret,
    /// `Authorization: Bearer <token>`
    Bearer,
}

/// 单个认证方式的判定结果
///
/// - [`Verdict::Skip`]：请求中没有该方式所需的请求头
/// - [`Verdict::Reject`]：请求头存在但校验失败
#[derive(Debug, PartialEq, Eq)]
enum Verdict {
    Accept,
    Reject,
    Skip,
}

/// `(secret, body, headers, now) -> Verdict`
type Verifier = fn(&str, &[u8], &HeaderMap, i64) -> Verdict;

/// 按优先级排列的认证方式
const SCHEMES: [(AuthScheme, Verifier); 3] = [
    (AuthScheme::Signature, verify_signature),
    (AuthScheme::SharedSecret, verify_shared_secret),
    (AuthScheme::Bearer, verify_bearer),
];

/// 使用 webhook 密钥认证请求。
///
/// 依次尝试 [`SCHEMES`] 中的认证方式，第一个通过的即为结果；
/// 全部未通过时返回 [`Error::Unauthorized`]。
///
/// `now` 为当前 unix 时间（秒）。
pub fn authenticate(
    secret: &str,
    body: &[u8],
    headers: &HeaderMap,
    now: i64,
) -> Result<AuthScheme> {
    for (scheme, verify) in SCHEMES {
        match verify(secret, body, headers, now) {
            Verdict::Accept => return Ok(scheme),
            Verdict::Reject => tracing::debug!(?scheme, "credentials rejected"),
            Verdict::Skip => {}
        }
    }
    Err(Error::Unauthorized)
}

/// 生成 `X-Signature` 请求头的值：`sha256=<hex(HMAC(secret, timestamp || body))>`
pub fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = new_mac(secret);
    mac.update(timestamp.as_bytes());
    mac.update(body);
    format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    )
}

fn new_mac(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length")
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn verify_signature(secret: &str, body: &[u8], headers: &HeaderMap, now: i64) -> Verdict {
    let (Some(signature), Some(timestamp)) = (
        header_str(headers, SIGNATURE_HEADER),
        header_str(headers, TIMESTAMP_HEADER),
    ) else {
        return Verdict::Skip;
    };

    let Some(ts) = parse_timestamp(timestamp) else {
        return Verdict::Reject;
    };
    let skew = now.checked_sub(ts).map(i64::unsigned_abs);
    if skew.is_none_or(|skew| skew > MAX_CLOCK_SKEW_SECS.unsigned_abs()) {
        tracing::debug!(ts, now, "signature timestamp outside allowed window");
        return Verdict::Reject;
    }

    let Some(expected) = signature
        .strip_prefix(SIGNATURE_PREFIX)
        .and_then(|h| hex::decode(h.trim()).ok())
    else {
        return Verdict::Reject;
    };

    // 签名覆盖请求头中原样的时间戳字符串
    let mut mac = new_mac(secret);
    mac.update(timestamp.as_bytes());
    mac.update(body);
    match mac.verify_slice(&expected) {
        Ok(()) => Verdict::Accept,
        Err(_) => Verdict::Reject,
    }
}

fn verify_shared_secret(secret: &str, _body: &[u8], headers: &HeaderMap, _now: i64) -> Verdict {
    match header_str(headers, SECRET_HEADER) {
        None => Verdict::Skip,
        Some(value) if constant_time_eq(value.as_bytes(), secret.as_bytes()) => Verdict::Accept,
        Some(_) => Verdict::Reject,
    }
}

fn verify_bearer(secret: &str, _body: &[u8], headers: &HeaderMap, _now: i64) -> Verdict {
    let Some(token) = header_str(headers, header::AUTHORIZATION)
        .and_then(|v| v.trim().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case(BEARER_SCHEME))
        .map(|(_, token)| token)
    else {
        return Verdict::Skip;
    };

    if constant_time_eq(token.trim().as_bytes(), secret.as_bytes()) {
        Verdict::Accept
    } else {
        Verdict::Reject
    }
}

/// 解析 unix 时间戳，毫秒级时间戳会被换算为秒；负数视为非法
fn parse_timestamp(s: &str) -> Option<i64> {
    let ts: i64 = s.trim().parse().ok().filter(|ts| *ts >= 0)?;
    Some(if ts > 1_000_000_000_000 { ts / 1000 } else { ts })
}

/// 比较两者的 SHA-256 摘要，耗时与输入内容和长度差异无关
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let (a, b) = (Sha256::digest(a), Sha256::digest(b));
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
