use http::{Method, StatusCode};

pub(crate) trait MethodExt {
    fn need_request_body(&self) -> bool;
}

impl MethodExt for Method {
    fn need_request_body(&self) -> bool {
        self == Method::POST || self == Method::PUT || self == Method::PATCH
    }
}

pub(crate) trait StatusExt {
    /// Detect 307/308 redirect
    fn is_redirect_retaining_status(&self) -> bool;

    /// Detect the 3xx statuses that carry a `Location` to follow.
    fn is_followable_redirect(&self) -> bool;
}

impl StatusExt for StatusCode {
    fn is_redirect_retaining_status(&self) -> bool {
        *self == StatusCode::TEMPORARY_REDIRECT || *self == StatusCode::PERMANENT_REDIRECT
    }

    fn is_followable_redirect(&self) -> bool {
        // 304 is a redirect code, but it has no location header and
        // thus we don't consider it a redirection.
        matches!(self.as_u16(), 301 | 302 | 303 | 307 | 308)
    }
}
