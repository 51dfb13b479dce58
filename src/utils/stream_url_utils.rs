use url::Url;

/// hosts that tend to serve the actual player, "cdn" and "live" alone match way too many images
/// and scripts so these only count together with a STREAM_HINTS keyword
const CDN_HINTS: &[&str] = &[
    "planetary",
    "lovecdn",
    "cdn",
    "stream",
    "live",
    "hls",
    "fmp4",
    "manifest",
];

const STREAM_HINTS: &[&str] = &["token", "m3u", "playlist", "index"];

/// manifest names to try under a tokenized path, in the order they're usually found
pub const MANIFEST_SUFFIXES: &[&str] = &[
    "/index.fmp4.m3u8",
    "/index.m3u8",
    "/playlist.m3u8",
    "/master.m3u8",
];

pub fn is_potential_stream(url: &str) -> bool {
    if url.contains(".m3u8") || url.contains(".mpd") {
        return true;
    }
    if url.contains("token=") {
        return true;
    }

    let lowered = url.to_lowercase();
    CDN_HINTS.iter().any(|k| lowered.contains(k)) && STREAM_HINTS.iter().any(|k| lowered.contains(k))
}

/// turns something like `https://x.cdn/path/seg.ts?token=abc` into
/// `https://x.cdn/path/index.fmp4.m3u8?token=abc`, anything without a token comes back as is
pub fn transform(candidate: &str) -> String {
    manifest_candidates(candidate)
        .into_iter()
        .next()
        .unwrap_or_else(|| candidate.to_string())
}

/// every manifest url worth trying for a tokenized candidate, empty if the candidate is already a
/// manifest or has nothing to build from
pub fn manifest_candidates(candidate: &str) -> Vec<String> {
    if candidate.contains(".m3u8") {
        return Vec::new();
    }

    let Ok(parsed) = Url::parse(candidate) else {
        return Vec::new();
    };
    let Some(token) = raw_query_value(&parsed, "token") else {
        return Vec::new();
    };
    let Some(host) = parsed.host_str() else {
        return Vec::new();
    };

    let authority = match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    let base_path = manifest_base_path(parsed.path());

    MANIFEST_SUFFIXES
        .iter()
        .map(|suffix| {
            format!(
                "{}://{}{}{}?token={}",
                parsed.scheme(),
                authority,
                base_path,
                suffix,
                token
            )
        })
        .collect()
}

/// moves a resolved address onto another host, keeping path and query. Used to point everything at
/// the faster edge the provider exposes
pub fn rewrite_host(stream_url: &str, host: &str) -> String {
    let Ok(mut parsed) = Url::parse(stream_url) else {
        return stream_url.to_string();
    };

    if parsed.set_host(Some(host)).is_err() {
        return stream_url.to_string();
    }
    // the mirror only speaks default ports
    let _ = parsed.set_port(None);

    parsed.to_string()
}

// keep the token exactly as the page sent it, decoding and re-encoding has broken signatures before
fn raw_query_value<'a>(url: &'a Url, key: &str) -> Option<&'a str> {
    url.query()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

fn manifest_base_path(path: &str) -> &str {
    let base = match path.rsplit_once('/') {
        // last segment looks like a file, drop it
        Some((dir, last)) if last.contains('.') => dir,
        _ => path,
    };
    base.trim_end_matches('/')
}
