//! Plain HTTP download through `curl`.

use planetkeeper_core::{Invocation, Snapshot};

/// Build `curl -L -o <target> <url>`.
pub(super) fn invocation(curl: Invocation, target: &Snapshot, url: &str) -> Invocation {
    curl.args(["-L", "-o", target.path().as_str(), url])
}
