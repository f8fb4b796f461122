//! Human-readable sequential codes (`EMP0001`, `CLI0001`, `PRJ0001`).
//!
//! The next number comes from the highest code already stored, and the
//! UNIQUE index on the code column settles concurrent creates: whoever loses
//! the race gets a duplicate-key error and moves on to the next candidate.

use log::warn;
use sqlx::mysql::{MySqlArguments, MySqlConnection};
use sqlx::query::Query;
use sqlx::MySql;

use crate::error::AppError;

#[derive(Debug, Clone, Copy)]
pub struct IdSequence {
    pub prefix: &'static str,
    pub width: usize,
    pub table: &'static str,
    pub column: &'static str,
}

pub const EMPLOYEE_IDS: IdSequence = IdSequence {
    prefix: "EMP",
    width: 4,
    table: "Employees_",
    column: "employee_code",
};

pub const CLIENT_IDS: IdSequence = IdSequence {
    prefix: "CLI",
    width: 4,
    table: "Clients_",
    column: "client_code",
};

pub const PROJECT_IDS: IdSequence = IdSequence {
    prefix: "PRJ",
    width: 4,
    table: "Projects_",
    column: "project_code",
};

impl IdSequence {
    pub fn format(&self, number: u64) -> String {
        format!("{}{:0width$}", self.prefix, number, width = self.width)
    }

    pub fn parse(&self, code: &str) -> Option<u64> {
        let digits = code.strip_prefix(self.prefix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Number following the highest stored code, or 1 for an empty table.
    pub async fn next_seed(&self, conn: &mut MySqlConnection) -> Result<u64, sqlx::Error> {
        let sql = format!(
            "SELECT {col} FROM {table} WHERE {col} LIKE ? \
             ORDER BY CHAR_LENGTH({col}) DESC, {col} DESC LIMIT 1",
            col = self.column,
            table = self.table,
        );
        let latest: Option<(String,)> = sqlx::query_as(&sql)
            .bind(format!("{}%", self.prefix))
            .fetch_optional(&mut *conn)
            .await?;
        Ok(next_after(latest.and_then(|(code,)| self.parse(&code))))
    }

    /// Runs `sql` with a fresh code bound as its first parameter, retrying
    /// with the next code on a duplicate-key error.
    ///
    /// Returns the code that stuck and the inserted row id.
    pub async fn insert_with_code<F>(
        &self,
        conn: &mut MySqlConnection,
        attempts: u32,
        sql: &str,
        bind_rest: F,
    ) -> Result<(String, i64), AppError>
    where
        F: for<'q> Fn(Query<'q, MySql, MySqlArguments>) -> Query<'q, MySql, MySqlArguments>,
    {
        let seed = self.next_seed(conn).await?;
        let mut allocator = CodeAllocator::new(*self, seed, attempts);
        while let Some(code) = allocator.next_code() {
            let outcome = bind_rest(sqlx::query(sql).bind(code.clone()))
                .execute(&mut *conn)
                .await
                .map(|result| result.last_insert_id() as i64);
            if let Some(id) = allocator.settle(&code, outcome)? {
                return Ok((code, id));
            }
        }
        Err(allocator.exhausted())
    }
}

/// Walks the candidate codes for one insert and decides, per attempt,
/// whether to stop, retry with the next code, or fail.
pub struct CodeAllocator {
    sequence: IdSequence,
    next: u64,
    remaining: u32,
    attempts: u32,
}

impl CodeAllocator {
    pub fn new(sequence: IdSequence, seed: u64, attempts: u32) -> Self {
        let attempts = attempts.max(1);
        Self {
            sequence,
            next: seed,
            remaining: attempts,
            attempts,
        }
    }

    pub fn next_code(&mut self) -> Option<String> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let code = self.sequence.format(self.next);
        self.next += 1;
        Some(code)
    }

    /// `Ok(Some(_))` when the insert stuck, `Ok(None)` to try the next code.
    pub fn settle<T>(&self, code: &str, outcome: Result<T, sqlx::Error>) -> Result<Option<T>, AppError> {
        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(e) if is_unique_violation(&e) => {
                warn!("{} {} is already taken, trying the next one", self.sequence.column, code);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn exhausted(&self) -> AppError {
        AppError::conflict(format!(
            "Could not allocate a unique {} after {} attempts",
            self.sequence.column, self.attempts
        ))
    }
}

fn next_after(latest: Option<u64>) -> u64 {
    latest.map_or(1, |n| n + 1)
}

pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::error::Error as StdError;
    use std::fmt;

    #[rstest]
    #[case(1, "EMP0001")]
    #[case(42, "EMP0042")]
    #[case(9999, "EMP9999")]
    #[case(12345, "EMP12345")]
    fn formats_zero_padded_codes(#[case] number: u64, #[case] expected: &str) {
        assert_eq!(EMPLOYEE_IDS.format(number), expected);
    }

    #[rstest]
    #[case("PRJ0007", Some(7))]
    #[case("PRJ12345", Some(12345))]
    #[case("CLI0007", None)]
    #[case("PRJ", None)]
    #[case("PRJ+12", None)]
    #[case("PRJ00a1", None)]
    fn parses_only_own_prefix(#[case] code: &str, #[case] expected: Option<u64>) {
        assert_eq!(PROJECT_IDS.parse(code), expected);
    }

    #[test]
    fn seed_continues_from_highest_code() {
        assert_eq!(next_after(None), 1);
        assert_eq!(next_after(CLIENT_IDS.parse("CLI0041")), 42);
    }

    #[test]
    fn candidates_step_through_consecutive_codes() {
        let mut allocator = CodeAllocator::new(CLIENT_IDS, 9, 3);
        let codes: Vec<String> = std::iter::from_fn(|| allocator.next_code()).collect();
        assert_eq!(codes, vec!["CLI0009", "CLI0010", "CLI0011"]);
    }

    #[derive(Debug)]
    struct DuplicateKey;

    impl fmt::Display for DuplicateKey {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("Duplicate entry")
        }
    }

    impl StdError for DuplicateKey {}

    impl DatabaseError for DuplicateKey {
        fn message(&self) -> &str {
            "Duplicate entry"
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    fn duplicate() -> sqlx::Error {
        sqlx::Error::Database(Box::new(DuplicateKey))
    }

    /// Drives an allocator against a fixed set of taken codes.
    fn allocate(seed: u64, attempts: u32, taken: &[&str]) -> Result<(String, Vec<String>), AppError> {
        let mut allocator = CodeAllocator::new(EMPLOYEE_IDS, seed, attempts);
        let mut tried = Vec::new();
        while let Some(code) = allocator.next_code() {
            tried.push(code.clone());
            let outcome = if taken.contains(&code.as_str()) {
                Err(duplicate())
            } else {
                Ok(())
            };
            if allocator.settle(&code, outcome)?.is_some() {
                return Ok((code, tried));
            }
        }
        Err(allocator.exhausted())
    }

    #[test]
    fn collision_moves_on_to_the_next_code() {
        let (code, tried) = allocate(7, 5, &["EMP0007"]).unwrap();
        assert_eq!(code, "EMP0008");
        assert_eq!(tried, vec!["EMP0007", "EMP0008"]);
    }

    #[test]
    fn running_out_of_attempts_is_a_conflict() {
        let err = allocate(1, 3, &["EMP0001", "EMP0002", "EMP0003", "EMP0004"]).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(err.to_string().contains("after 3 attempts"));
    }

    #[test]
    fn other_database_errors_stop_immediately() {
        let allocator = CodeAllocator::new(CLIENT_IDS, 1, 5);
        let err = allocator
            .settle::<()>("CLI0001", Err(sqlx::Error::PoolTimedOut))
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let mut allocator = CodeAllocator::new(PROJECT_IDS, 3, 0);
        assert_eq!(allocator.next_code().as_deref(), Some("PRJ0003"));
        assert_eq!(allocator.next_code(), None);
    }

    #[test]
    fn non_database_errors_are_not_collisions() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }
}
