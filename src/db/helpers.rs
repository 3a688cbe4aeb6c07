use sqlx::{QueryBuilder, Sqlite};

/// Append ` IN (?, ?, …)` binding every value. Callers must not pass an empty
/// slice; SQLite rejects `IN ()`.
pub(crate) fn push_in_list<'args, T>(qb: &mut QueryBuilder<'args, Sqlite>, values: &[T])
where
    T: Clone + Send + 'args + sqlx::Encode<'args, Sqlite> + sqlx::Type<Sqlite>,
{
    qb.push(" IN (");
    let mut list = qb.separated(", ");
    for value in values {
        list.push_bind(value.clone());
    }
    list.push_unseparated(")");
}

/// Whether a storage error is a uniqueness violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
