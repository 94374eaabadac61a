//! Unit tests for tag index error types

#[cfg(test)]
mod tests {
    use crate::db::error::DbError;
    use std::error::Error;

    #[test]
    fn test_tag_not_found_error() {
        let error = DbError::TagNotFound("music".to_string());
        assert_eq!(error.to_string(), "Tag not found: music");
    }

    #[test]
    fn test_tag_exists_error() {
        let error = DbError::TagExists("music".to_string());
        assert_eq!(error.to_string(), "Tag already exists: music");
    }

    #[test]
    fn test_invalid_tag_name_display() {
        let error = DbError::InvalidTagName("a+b".to_string());
        let display = format!("{}", error);
        assert!(display.contains("Invalid tag name"));
        assert!(display.contains("a+b"));
    }

    #[test]
    fn test_error_debug() {
        let error = DbError::CorruptKey("short key".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("CorruptKey"));
        assert!(debug.contains("short key"));
    }

    #[test]
    fn test_error_source() {
        let error = DbError::TagNotFound("music".to_string());
        assert!(error.source().is_none());
    }

    #[test]
    fn test_transaction_abort_conversion() {
        let error: DbError = sled::transaction::TransactionError::Abort(()).into();
        assert!(matches!(error, DbError::TransactionAborted));
    }

    #[test]
    fn test_transaction_storage_conversion() {
        let storage = sled::Error::Unsupported("readonly".to_string());
        let error: DbError = sled::transaction::TransactionError::<()>::Storage(storage).into();
        assert!(matches!(error, DbError::SledError(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DbError>();
    }
}
