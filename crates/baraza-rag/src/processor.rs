use crate::error::QueryError;
use baraza_types::BackendResult;

/// Resolves one query against the knowledge base.
///
/// Calls may block for seconds and must only be made from a context where
/// blocking is allowed (`tokio::task::spawn_blocking` or a plain thread).
/// One instance is shared by every connection.
pub trait QueryProcessor: Send + Sync {
    fn process(&self, query: &str) -> Result<BackendResult, QueryError>;
}

impl<F> QueryProcessor for F
where
    F: Fn(&str) -> Result<BackendResult, QueryError> + Send + Sync,
{
    fn process(&self, query: &str) -> Result<BackendResult, QueryError> {
        self(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_processors() {
        let upper = |q: &str| -> Result<BackendResult, QueryError> {
            Ok(BackendResult::Text(q.to_uppercase()))
        };
        assert_eq!(
            upper.process("ping").unwrap(),
            BackendResult::Text("PING".to_string())
        );

        let failing = |_: &str| -> Result<BackendResult, QueryError> {
            Err(QueryError::Timeout("model".to_string()))
        };
        assert!(matches!(failing.process("x"), Err(QueryError::Timeout(_))));
    }
}
