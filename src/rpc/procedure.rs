use axum::http::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    Query,
    Mutation,
}

impl ProcedureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcedureKind::Query => "query",
            ProcedureKind::Mutation => "mutation",
        }
    }

    /// Queries are read with GET, mutations are sent with POST.
    pub fn method(self) -> Method {
        match self {
            ProcedureKind::Query => Method::GET,
            ProcedureKind::Mutation => Method::POST,
        }
    }
}

/// Every procedure the router serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedure {
    HelloTest,
    PatsCreate,
    PatsList,
    PatsDelete,
}

impl Procedure {
    pub const ALL: [Procedure; 4] = [
        Procedure::HelloTest,
        Procedure::PatsCreate,
        Procedure::PatsList,
        Procedure::PatsDelete,
    ];

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.path() == path)
    }

    pub fn path(self) -> &'static str {
        match self {
            Procedure::HelloTest => "test.test",
            Procedure::PatsCreate => "pats.createPat",
            Procedure::PatsList => "pats.list",
            Procedure::PatsDelete => "pats.delete",
        }
    }

    pub fn kind(self) -> ProcedureKind {
        match self {
            Procedure::HelloTest | Procedure::PatsList => ProcedureKind::Query,
            Procedure::PatsCreate | Procedure::PatsDelete => ProcedureKind::Mutation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_round_trip() {
        for p in Procedure::ALL {
            assert_eq!(Procedure::from_path(p.path()), Some(p));
        }
        assert_eq!(Procedure::from_path("pats.update"), None);
        assert_eq!(Procedure::from_path("pats"), None);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Procedure::PatsList.kind().method(), Method::GET);
        assert_eq!(Procedure::PatsCreate.kind().method(), Method::POST);
        assert_eq!(Procedure::PatsDelete.kind().as_str(), "mutation");
    }
}
