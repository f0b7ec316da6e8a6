use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Stamps the build with a UTC RFC 3339 timestamp, read back by
/// `usdc::BUILD_STAMP`. Set `USDC_BUILD_STAMP` to pin it.
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=USDC_BUILD_STAMP");

    let stamp = std::env::var("USDC_BUILD_STAMP").unwrap_or_else(|_| {
        let now = OffsetDateTime::now_utc();
        let now = now.replace_nanosecond(0).unwrap_or(now);
        now.format(&Rfc3339).unwrap_or_else(|_| "unknown".to_string())
    });
    println!("cargo:rustc-env=USDC_BUILD_STAMP={}", stamp);
}
