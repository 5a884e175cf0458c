use http::Request;
use http::Uri;

/// Extracts the path a request is matched against.
///
/// Requests and URIs expose only their path, never the query. Plain strings are
/// matched as given, so exclusion patterns that don't end in `/` still ignore
/// everything from their last `?`.
pub trait RequestPath {
    fn request_path(&self) -> &str;
}

impl RequestPath for Uri {
    fn request_path(&self) -> &str {
        self.path()
    }
}

impl<B> RequestPath for Request<B> {
    fn request_path(&self) -> &str {
        self.uri().request_path()
    }
}

impl RequestPath for String {
    fn request_path(&self) -> &str {
        self
    }
}

impl RequestPath for &str {
    fn request_path(&self) -> &str {
        self
    }
}
