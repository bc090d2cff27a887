//! Shared WHERE/HAVING chain for SELECT, UPDATE and DELETE.

use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::value::Value;

/// How a condition couples to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

impl Conjunction {
    pub fn as_str(self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// An ordered chain of `(conjunction, condition)` pairs.
///
/// The first entry's conjunction is recorded but never emitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereBuilder {
    conditions: Vec<(Conjunction, Condition)>,
}

impl WhereBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn push(&mut self, conjunction: Conjunction, condition: Condition) {
        self.conditions.push((conjunction, condition));
    }

    pub fn and(&mut self, condition: Condition) {
        self.push(Conjunction::And, condition);
    }

    pub fn or(&mut self, condition: Condition) {
        self.push(Conjunction::Or, condition);
    }

    pub fn clear(&mut self) {
        self.conditions.clear();
    }

    /// Append the chain (without a `WHERE`/`HAVING` keyword) to `sql`.
    pub fn append_to(&self, dialect: Dialect, sql: &mut String, params: &mut Vec<Value>) -> OrmResult<()> {
        for (i, (conjunction, condition)) in self.conditions.iter().enumerate() {
            if i > 0 {
                sql.push(' ');
                sql.push_str(conjunction.as_str());
                sql.push(' ');
            }
            condition.append_to(dialect, sql, params)?;
        }
        Ok(())
    }

    /// Build the chain on its own.
    pub fn build_clause(&self, dialect: Dialect) -> OrmResult<(String, Vec<Value>)> {
        let mut sql = String::new();
        let mut params = Vec::new();
        self.append_to(dialect, &mut sql, &mut params)?;
        Ok((sql, params))
    }
}

impl FromIterator<Condition> for WhereBuilder {
    fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
        Self {
            conditions: iter.into_iter().map(|c| (Conjunction::And, c)).collect(),
        }
    }
}
