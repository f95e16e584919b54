use anyhow::{anyhow, Result};
use rust_decimal::Decimal;

/// Winston per AR (10^12). All conversions go through `Decimal`.
const WINSTON_PER_AR: u64 = 1_000_000_000_000;

pub fn remove_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url[..url.len() - 1].to_string()
    } else {
        url.to_string()
    }
}

/// Convert an AR amount to an integral winston string for a transaction
/// quantity. Sub-winston precision is truncated.
pub fn ar_to_winston(ar: Decimal) -> Result<String> {
    if ar.is_sign_negative() {
        return Err(anyhow!("negative AR amount: {}", ar));
    }
    let winston = ar
        .checked_mul(Decimal::from(WINSTON_PER_AR))
        .ok_or_else(|| anyhow!("AR amount overflows winston range: {}", ar))?;
    Ok(winston.trunc().to_string())
}

pub fn winston_to_ar(winston: &str) -> Result<Decimal> {
    let w: Decimal = winston
        .parse()
        .map_err(|e| anyhow!("invalid winston amount {:?}: {}", winston, e))?;
    w.checked_div(Decimal::from(WINSTON_PER_AR))
        .ok_or_else(|| anyhow!("winston conversion failed for {}", winston))
}

pub async fn retry<T, E, F, Fut>(mut retries: u32, base_delay_ms: u64, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
{
    let mut attempt = 0u32;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if retries == 0 => return Err(e),
            Err(e) => {
                // Exponential backoff: base_delay * 2^attempt, capped at 30s
                let delay = (base_delay_ms * (1u64 << attempt.min(5))).min(30_000);
                log::warn!(
                    "attempt {} failed ({:?}), retrying in {}ms...",
                    attempt + 1,
                    e,
                    delay
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                retries -= 1;
                attempt += 1;
            }
        }
    }
}
