use crate::models::contract::PrincipalId;

/// Who is asking. Passed explicitly into every listing and mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub principal: Option<PrincipalId>,
}

impl RequestContext {
    pub fn authenticated(principal: impl Into<PrincipalId>) -> Self {
        Self {
            principal: Some(principal.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn principal(&self) -> Option<&PrincipalId> {
        self.principal.as_ref()
    }
}
