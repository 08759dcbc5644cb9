use promptgate_core::GuardVerdict;

/// Stage that runs after the guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Respond,
    Reject,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Respond => "respond",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn route(verdict: &GuardVerdict) -> Route {
    match verdict {
        GuardVerdict::Allowed => Route::Respond,
        GuardVerdict::Denied { .. } | GuardVerdict::Pending => Route::Reject,
    }
}

#[cfg(test)]
mod tests {
    use promptgate_core::GuardVerdict;

    use super::{route, Route};

    #[test]
    fn allowed_routes_to_respond() {
        assert_eq!(route(&GuardVerdict::Allowed), Route::Respond);
        assert_eq!(route(&GuardVerdict::from_parts(true, None)), Route::Respond);
    }

    #[test]
    fn anything_else_routes_to_reject() {
        assert_eq!(route(&GuardVerdict::from_parts(false, None)), Route::Reject);
        assert_eq!(
            route(&GuardVerdict::Denied { reason: Some("too long".to_string()) }),
            Route::Reject
        );
        assert_eq!(route(&GuardVerdict::Pending), Route::Reject);
    }

    #[test]
    fn stage_names() {
        assert_eq!(Route::Respond.to_string(), "respond");
        assert_eq!(Route::Reject.to_string(), "reject");
    }
}
