use sea_orm::{
    sea_query::{DynIden, Expr, Func, LikeExpr},
    ColumnTrait, Condition,
};

const LIKE_ESCAPE: char = '\\';

/// Case-insensitive substring search across several columns, OR-combined.
///
/// A blank term produces no condition so callers fall back to an unfiltered
/// query.
pub struct SearchBuilder {
    pattern: Option<String>,
    columns: Vec<(DynIden, DynIden)>,
}

impl SearchBuilder {
    pub fn new(term: Option<&str>) -> Self {
        let pattern = term
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| format!("%{}%", escape_like(&t.to_lowercase())));
        Self {
            pattern,
            columns: Vec::new(),
        }
    }

    /// Adds a column to match the term against
    pub fn column<C: ColumnTrait>(mut self, column: C) -> Self {
        self.columns.push(column.as_column_ref());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_none() || self.columns.is_empty()
    }

    /// Builds `LOWER(col_a) LIKE p OR LOWER(col_b) LIKE p ...`
    pub fn build(self) -> Option<Condition> {
        let pattern = self.pattern?;
        if self.columns.is_empty() {
            return None;
        }
        let condition = self
            .columns
            .into_iter()
            .fold(Condition::any(), |condition, column| {
                condition.add(
                    Expr::expr(Func::lower(Expr::col(column)))
                        .like(LikeExpr::new(pattern.clone()).escape(LIKE_ESCAPE)),
                )
            });
        Some(condition)
    }
}

/// Escapes LIKE metacharacters so user input only ever matches literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::patient;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};

    #[test]
    fn escapes_like_metacharacters() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn blank_term_builds_nothing() {
        let builder = SearchBuilder::new(Some("   ")).column(patient::Column::Name);
        assert!(builder.is_empty());
        assert!(builder.build().is_none());
        assert!(SearchBuilder::new(None)
            .column(patient::Column::Name)
            .build()
            .is_none());
    }

    #[test]
    fn builds_or_group_over_lowered_columns() {
        let condition = SearchBuilder::new(Some(" Smith "))
            .column(patient::Column::Name)
            .column(patient::Column::PatientId)
            .column(patient::Column::Phone)
            .build()
            .expect("condition");

        let sql = patient::Entity::find()
            .filter(condition)
            .build(DbBackend::Sqlite)
            .to_string();

        assert!(sql.contains(r#"LOWER("patients"."name") LIKE '%smith%'"#), "{sql}");
        assert!(sql.contains(r#"LOWER("patients"."patient_id") LIKE '%smith%'"#), "{sql}");
        assert!(sql.contains(" OR "), "{sql}");
    }
}
