//! The study query compiler.
//!
//! Turns a [`StudyFilter`] plus pagination and sort into one parameterized
//! page query and a structurally identical count query. Joins are added
//! lazily: the series table only when a protocol filter is present, the
//! project association table only when a project id or participation id is
//! present. Validation failures surface here, before anything reaches the
//! repository.

use thiserror::Error;
use tracing::debug;

use pacsview_core::CoreError;

use crate::filter::{PageRequest, SortField, SortSpec, StudyFilter};
use crate::sql::{BuiltQuery, SqlValue};

/// Days-per-year factor used by the age filter. Documented approximation,
/// not calendar-exact.
const DAYS_PER_YEAR: f64 = 365.0;

/// Ages above this are assumed to be form mistakes.
const MAX_AGE_YEARS: u16 = 150;

/// Errors raised during query compilation.
#[derive(Debug, Error)]
pub enum QueryBuildError {
    #[error("Unknown sort field: {0}")]
    InvalidSortField(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

impl From<QueryBuildError> for CoreError {
    fn from(err: QueryBuildError) -> Self {
        CoreError::validation(err.to_string())
    }
}

/// The two compiled queries for one search: the page and its total count.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSearch {
    pub page: BuiltQuery,
    pub count: BuiltQuery,
}

/// A validated, compiled search request: the repository's input.
///
/// SQL-backed repositories execute `compiled`; the in-memory backend
/// evaluates `filter`/`sort`/`page` with identical semantics.
#[derive(Debug, Clone)]
pub struct StudyQuery {
    pub filter: StudyFilter,
    pub page: PageRequest,
    pub sort: SortSpec,
    pub compiled: CompiledSearch,
}

/// Compile a filter, pagination and sort into a [`StudyQuery`].
///
/// # Errors
///
/// Returns [`QueryBuildError::InvalidFilter`] for out-of-range criteria.
/// Sort fields are already validated by construction of [`SortSpec`].
pub fn compile(
    filter: StudyFilter,
    page: PageRequest,
    sort: SortSpec,
) -> Result<StudyQuery, QueryBuildError> {
    if let Some(age) = filter.age
        && age > MAX_AGE_YEARS
    {
        return Err(QueryBuildError::InvalidFilter(format!(
            "age out of range: {age}"
        )));
    }
    if page.page_size == 0 {
        return Err(QueryBuildError::InvalidFilter(
            "page size must be positive".into(),
        ));
    }

    let mut params = Vec::new();
    let from = build_from(&filter);
    let where_clause = build_where(&filter, &mut params);
    let order = build_order(sort);

    let select_cols = select_columns(sort);
    let mut page_sql = format!("select distinct {select_cols} from {from}");
    let mut count_sql = format!("select count(distinct study.pk) from {from}");

    if let Some(where_sql) = &where_clause {
        page_sql.push_str(" where ");
        page_sql.push_str(where_sql);
        count_sql.push_str(" where ");
        count_sql.push_str(where_sql);
    }

    page_sql.push_str(" order by ");
    page_sql.push_str(&order);
    page_sql.push_str(&format!(
        " limit {} offset {}",
        page.limit(),
        page.offset()
    ));

    let compiled = CompiledSearch {
        page: BuiltQuery::new(page_sql, params.clone()),
        count: BuiltQuery::new(count_sql, params),
    };
    debug!(query = %compiled.page, "compiled study search");

    Ok(StudyQuery {
        filter,
        page,
        sort,
        compiled,
    })
}

/// The patient join is unconditional: the default sort key and half the
/// predicates live on the patient table.
fn build_from(filter: &StudyFilter) -> String {
    let mut from = String::from("study join patient on patient.pk = study.patient_fk");
    if filter.wants_series() {
        from.push_str(" join series on series.study_fk = study.pk");
    }
    if filter.wants_association() {
        from.push_str(" join project_association association on association.study_fk = study.pk");
    }
    from
}

fn build_where(filter: &StudyFilter, params: &mut Vec<SqlValue>) -> Option<String> {
    let mut clauses: Vec<String> = Vec::new();

    if let Some(name) = filter.name() {
        clauses.push("lower(patient.pat_name) like ?".into());
        params.push(like_pattern(name));
    }
    if let Some(id) = filter.id() {
        clauses.push("(lower(patient.pat_id) like ? or lower(study.study_custom1) like ?)".into());
        params.push(like_pattern(id));
        params.push(like_pattern(id));
    }
    if let Some(age) = filter.age {
        let span = "cast(study.study_datetime as date) - cast(patient.pat_birthdate as date)";
        clauses.push(format!("{span} >= ? and {span} < ?"));
        params.push(SqlValue::Float(DAYS_PER_YEAR * f64::from(age)));
        params.push(SqlValue::Float(DAYS_PER_YEAR * f64::from(age + 1)));
    }
    if let Some(sex) = filter.sex {
        clauses.push("patient.pat_sex = ?".into());
        params.push(SqlValue::Char(sex));
    }
    if let Some(protocol) = filter.protocol() {
        clauses.push("lower(series.series_custom1) like ?".into());
        params.push(like_pattern(protocol));
    }
    if let Some(description) = filter.description() {
        clauses.push("lower(study.study_desc) like ?".into());
        params.push(like_pattern(description));
    }
    if let Some((op, date)) = filter.acquisition {
        clauses.push(format!(
            "cast(study.study_datetime as date) {} ?",
            op.as_sql()
        ));
        params.push(SqlValue::Date(date));
    }
    if let Some(project) = filter.project {
        clauses.push("association.project_fk = ?".into());
        params.push(SqlValue::Integer(project));
    }
    if let Some(participation) = filter.participation_id() {
        clauses.push("association.participation_id = ?".into());
        params.push(SqlValue::Text(participation.to_string()));
    }

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" and "))
    }
}

/// The default key is always appended as secondary sort so page boundaries
/// stay deterministic when the chosen key is not unique.
fn build_order(sort: SortSpec) -> String {
    let primary = format!("{} {}", sort.field.column(), sort.direction.as_sql());
    if sort.field == SortField::PatientPk {
        primary
    } else {
        format!("{primary}, {} asc", SortField::PatientPk.column())
    }
}

/// `select distinct` requires every ordering column in the select list.
fn select_columns(sort: SortSpec) -> String {
    let mut cols = vec![
        "study.pk",
        "study.patient_fk",
        "study.study_desc",
        "study.study_datetime",
        "study.study_custom1",
        "patient.pk",
    ];
    let sort_col = sort.field.column();
    if !cols.contains(&sort_col) {
        cols.push(sort_col);
    }
    cols.join(", ")
}

fn like_pattern(value: &str) -> SqlValue {
    SqlValue::Text(format!("%{}%", value.to_lowercase()))
}
