//! Title filter compilation
//!
//! Turns the named filter fields of a `/api/titles` request into one
//! `SELECT` over either the flat title view or the resolution-joined view,
//! together with the values to bind. Values never enter the statement
//! text: every clause uses a `?` placeholder.
//!
//! Every field has a fixed column and comparator. All clauses are joined
//! with `AND`. A field supplied with an empty or blank value is ignored.
//!
//! SQLite folds case for ASCII only, so contains-match clauses are not
//! sent to the database. They are applied to the fetched rows with
//! Unicode lowercase folding; see [`TitleQuery::matches`].

use std::collections::{BTreeSet, HashMap};

use nahuel_common::db::TitleRecord;

use crate::error::{ApiError, ApiResult};

/// Raw filter values keyed by field name, as received on the query string
pub type FilterCriteria = HashMap<String, String>;

/// Name of the title state set filter
pub const TITLE_STATES_FIELD: &str = "titleStates";

const TITLE_STATE_COLUMN: &str = "title_state_code";

/// Columns returned for every title query, shared by both views
pub const TITLE_COLUMNS: &str = "id_title, edu_institution_name, academic_unit_name, \
    career_type_name, career_code, career_name, title_code, title, title_female_name, \
    title_comment, title_type_name, title_mode_name, title_state_code";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `column = ?`
    Exact,
    /// Case-insensitive substring match
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterGroup {
    /// Column of the flat title view
    Direct,
    /// Column only present once resolutions are joined in
    Resolution,
}

#[derive(Debug, Clone, Copy)]
pub struct FilterField {
    pub name: &'static str,
    pub column: &'static str,
    pub comparator: Comparator,
    pub group: FilterGroup,
}

/// Supported filter fields, in clause order
pub const FILTER_FIELDS: &[FilterField] = &[
    FilterField {
        name: "institution",
        column: "edu_institution_name",
        comparator: Comparator::Contains,
        group: FilterGroup::Direct,
    },
    FilterField {
        name: "academicUnit",
        column: "academic_unit_name",
        comparator: Comparator::Contains,
        group: FilterGroup::Direct,
    },
    FilterField {
        name: "careerType",
        column: "career_type_name",
        comparator: Comparator::Exact,
        group: FilterGroup::Direct,
    },
    FilterField {
        name: "career",
        column: "career_name",
        comparator: Comparator::Contains,
        group: FilterGroup::Direct,
    },
    FilterField {
        name: "titleType",
        column: "title_type_name",
        comparator: Comparator::Exact,
        group: FilterGroup::Direct,
    },
    FilterField {
        name: "title",
        column: "title",
        comparator: Comparator::Contains,
        group: FilterGroup::Direct,
    },
    FilterField {
        name: "resolutionType",
        column: "resolution_type_name",
        comparator: Comparator::Exact,
        group: FilterGroup::Resolution,
    },
    FilterField {
        name: "resolutionNumber",
        column: "resolution_number",
        comparator: Comparator::Exact,
        group: FilterGroup::Resolution,
    },
    FilterField {
        name: "resolutionYear",
        column: "resolution_year",
        comparator: Comparator::Exact,
        group: FilterGroup::Resolution,
    },
];

/// View a title query reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleView {
    Flat,
    ResolutionJoined,
}

impl TitleView {
    pub fn name(self) -> &'static str {
        match self {
            Self::Flat => "v_career_title",
            Self::ResolutionJoined => "v_career_title_resolution",
        }
    }
}

/// Case-insensitive substring clause, applied after the rows are fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    pub column: &'static str,
    /// Lowercased filter value
    pub needle: String,
}

impl TextMatch {
    fn new(column: &'static str, value: &str) -> Self {
        Self {
            column,
            needle: value.to_lowercase(),
        }
    }

    /// A missing column value never matches
    pub fn matches(&self, record: &TitleRecord) -> bool {
        record_text(record, self.column)
            .map(|text| text.to_lowercase().contains(&self.needle))
            .unwrap_or(false)
    }
}

/// Text of a contains-match column on a fetched title
fn record_text<'a>(record: &'a TitleRecord, column: &str) -> Option<&'a str> {
    match column {
        "edu_institution_name" => record.institution.as_deref(),
        "academic_unit_name" => record.academic_unit.as_deref(),
        "career_name" => record.career_name.as_deref(),
        "title" => Some(record.title_name.as_str()),
        _ => None,
    }
}

/// A compiled title query: statement text plus positional parameters,
/// and the contains-match clauses to apply to its rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleQuery {
    pub view: TitleView,
    pub sql: String,
    pub params: Vec<String>,
    pub text_matches: Vec<TextMatch>,
    /// Number of `AND`-joined clauses, in SQL and over rows
    pub clause_count: usize,
}

impl TitleQuery {
    /// True when no filter narrowed the result
    pub fn is_unrestricted(&self) -> bool {
        self.clause_count == 0
    }

    /// True when a fetched row satisfies every contains-match clause
    pub fn matches(&self, record: &TitleRecord) -> bool {
        self.text_matches.iter().all(|m| m.matches(record))
    }
}

/// Compile filter criteria into a single parameterized query.
///
/// Fails with [`ApiError::Input`] only when `titleStates` is present but
/// not a JSON object of code to boolean.
pub fn compile(criteria: &FilterCriteria) -> ApiResult<TitleQuery> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<String> = Vec::new();
    let mut text_matches: Vec<TextMatch> = Vec::new();
    let mut view = TitleView::Flat;

    for field in FILTER_FIELDS {
        let Some(value) = supplied(criteria, field.name) else {
            continue;
        };

        if field.group == FilterGroup::Resolution {
            view = TitleView::ResolutionJoined;
        }

        match field.comparator {
            Comparator::Exact => {
                clauses.push(format!("{} = ?", field.column));
                params.push(value.to_string());
            }
            Comparator::Contains => text_matches.push(TextMatch::new(field.column, value)),
        }
    }

    if let Some(raw) = supplied(criteria, TITLE_STATES_FIELD) {
        let states = parse_title_states(raw)?;
        // An empty set constrains nothing
        if !states.is_empty() {
            let placeholders = vec!["?"; states.len()].join(", ");
            clauses.push(format!("{} IN ({})", TITLE_STATE_COLUMN, placeholders));
            params.extend(states);
        }
    }

    // The joined view has one row per linked resolution
    let select = match view {
        TitleView::Flat => "SELECT",
        TitleView::ResolutionJoined => "SELECT DISTINCT",
    };
    let mut sql = format!("{} {} FROM {}", select, TITLE_COLUMNS, view.name());
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    Ok(TitleQuery {
        view,
        sql,
        params,
        clause_count: clauses.len() + text_matches.len(),
        text_matches,
    })
}

/// Trimmed value of a field, or `None` when absent or blank
fn supplied<'a>(criteria: &'a FilterCriteria, name: &str) -> Option<&'a str> {
    criteria
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Parse a `titleStates` value: a JSON object mapping state code to a
/// boolean. Codes mapped to `true` form the set.
pub fn parse_title_states(raw: &str) -> ApiResult<BTreeSet<String>> {
    let states: HashMap<String, bool> = serde_json::from_str(raw).map_err(|e| {
        ApiError::Input(format!(
            "titleStates must be a JSON object of state code to boolean: {}",
            e
        ))
    })?;

    Ok(states
        .into_iter()
        .filter_map(|(code, selected)| selected.then_some(code))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(pairs: &[(&str, &str)]) -> FilterCriteria {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn record(title: &str, career: Option<&str>) -> TitleRecord {
        TitleRecord {
            id_title: 1,
            institution: Some("Universidad Nacional".to_string()),
            academic_unit: Some("Facultad de Ingeniería".to_string()),
            career_type: Some("Grado".to_string()),
            career_code: Some("SYS".to_string()),
            career_name: career.map(str::to_string),
            title_code: "T1".to_string(),
            title_name: title.to_string(),
            title_female_name: None,
            comment: None,
            title_type: Some("Grado".to_string()),
            career_mode: Some("Presencial".to_string()),
            state: Some("V".to_string()),
        }
    }

    #[test]
    fn test_no_fields_yields_unrestricted_flat_query() {
        let q = compile(&FilterCriteria::new()).unwrap();
        assert_eq!(q.view, TitleView::Flat);
        assert!(q.is_unrestricted());
        assert!(q.params.is_empty());
        assert_eq!(q.sql, format!("SELECT {} FROM v_career_title", TITLE_COLUMNS));
    }

    #[test]
    fn test_exact_match_on_flat_view() {
        let q = compile(&criteria(&[("careerType", "Undergraduate")])).unwrap();
        assert_eq!(q.view, TitleView::Flat);
        assert_eq!(q.clause_count, 1);
        assert!(q.sql.ends_with("FROM v_career_title WHERE career_type_name = ?"));
        assert_eq!(q.params, vec!["Undergraduate"]);
    }

    #[test]
    fn test_resolution_field_switches_to_joined_view() {
        let q = compile(&criteria(&[("resolutionYear", "2020")])).unwrap();
        assert_eq!(q.view, TitleView::ResolutionJoined);
        assert_eq!(q.clause_count, 1);
        assert!(q.sql.starts_with("SELECT DISTINCT"));
        assert!(q
            .sql
            .ends_with("FROM v_career_title_resolution WHERE resolution_year = ?"));
        assert_eq!(q.params, vec!["2020"]);
    }

    #[test]
    fn test_contains_match_is_applied_to_rows_not_sql() {
        let q = compile(&criteria(&[("career", "Sistemas")])).unwrap();
        assert_eq!(q.clause_count, 1);
        assert!(!q.is_unrestricted());
        assert_eq!(q.sql, format!("SELECT {} FROM v_career_title", TITLE_COLUMNS));
        assert!(q.params.is_empty());
        assert_eq!(
            q.text_matches,
            vec![TextMatch {
                column: "career_name",
                needle: "sistemas".to_string()
            }]
        );
    }

    #[test]
    fn test_every_field_gets_one_clause_with_its_comparator() {
        let all: Vec<(&str, &str)> = FILTER_FIELDS.iter().map(|f| (f.name, "v")).collect();
        let q = compile(&criteria(&all)).unwrap();

        let exact = FILTER_FIELDS
            .iter()
            .filter(|f| f.comparator == Comparator::Exact)
            .count();
        assert_eq!(q.clause_count, FILTER_FIELDS.len());
        assert_eq!(q.params.len(), exact);
        assert_eq!(q.text_matches.len(), FILTER_FIELDS.len() - exact);
        assert_eq!(q.sql.matches(" AND ").count(), exact - 1);
        assert!(!q.sql.contains(" OR "));

        for field in FILTER_FIELDS {
            match field.comparator {
                Comparator::Exact => {
                    let clause = format!("{} = ?", field.column);
                    assert_eq!(q.sql.matches(&clause).count(), 1, "clause for {}", field.name);
                }
                Comparator::Contains => {
                    let count = q
                        .text_matches
                        .iter()
                        .filter(|m| m.column == field.column)
                        .count();
                    assert_eq!(count, 1, "clause for {}", field.name);
                }
            }
        }
    }

    #[test]
    fn test_every_contains_column_reads_a_record_field() {
        let full = record("Ingeniero", Some("Sistemas"));
        for field in FILTER_FIELDS
            .iter()
            .filter(|f| f.comparator == Comparator::Contains)
        {
            assert!(record_text(&full, field.column).is_some(), "{}", field.name);
        }
    }

    #[test]
    fn test_clauses_follow_field_order() {
        let q = compile(&criteria(&[("title", "Ing"), ("institution", "UN")])).unwrap();
        let columns: Vec<&str> = q.text_matches.iter().map(|m| m.column).collect();
        assert_eq!(columns, vec!["edu_institution_name", "title"]);

        let q = compile(&criteria(&[("titleType", "Grado"), ("careerType", "UG")])).unwrap();
        assert!(q
            .sql
            .ends_with("WHERE career_type_name = ? AND title_type_name = ?"));
        assert_eq!(q.params, vec!["UG", "Grado"]);
    }

    #[test]
    fn test_contains_match_folds_accented_case() {
        let stored = record("INGENIERÍA EN SISTEMAS", Some("Ingeniería"));

        for value in ["ingeniería", "Ingeniería en sistemas", "ÍA EN"] {
            let q = compile(&criteria(&[("title", value)])).unwrap();
            assert!(q.matches(&stored), "value {:?}", value);
        }

        let q = compile(&criteria(&[("career", "INGENIERÍA")])).unwrap();
        assert!(q.matches(&stored));

        let q = compile(&criteria(&[("title", "medicina")])).unwrap();
        assert!(!q.matches(&stored));
    }

    #[test]
    fn test_contains_match_is_literal_and_needs_every_clause() {
        let stored = record("Plan 50 off", Some("Sistemas"));

        let q = compile(&criteria(&[("title", "50%")])).unwrap();
        assert!(!q.matches(&stored));
        let q = compile(&criteria(&[("title", "_")])).unwrap();
        assert!(!q.matches(&stored));

        let q = compile(&criteria(&[("title", "plan"), ("career", "data")])).unwrap();
        assert!(!q.matches(&stored));
        let q = compile(&criteria(&[("title", "plan"), ("career", "sis")])).unwrap();
        assert!(q.matches(&stored));
    }

    #[test]
    fn test_contains_match_on_missing_column_is_no_match() {
        let stored = record("Ingeniero", None);
        let q = compile(&criteria(&[("career", "a")])).unwrap();
        assert!(!q.matches(&stored));
    }

    #[test]
    fn test_values_are_never_interpolated() {
        let hostile = "x' OR '1'='1";
        let q = compile(&criteria(&[("titleType", hostile), ("career", hostile)])).unwrap();
        assert!(!q.sql.contains(hostile));
        assert!(!q.sql.contains("'1'"));
        assert_eq!(q.params[0], hostile);
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let q = compile(&criteria(&[("career", ""), ("resolutionYear", "")])).unwrap();
        assert!(q.is_unrestricted());
        assert_eq!(q.view, TitleView::Flat);
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let q = compile(&criteria(&[
            ("career", "   "),
            ("careerType", "\t"),
            ("resolutionYear", " "),
            ("titleStates", "  "),
        ]))
        .unwrap();
        assert!(q.is_unrestricted());
        assert!(q.text_matches.is_empty());
        assert_eq!(q.view, TitleView::Flat);
    }

    #[test]
    fn test_values_are_trimmed() {
        let q = compile(&criteria(&[("careerType", " Grado "), ("title", "  Ing ")])).unwrap();
        assert_eq!(q.params, vec!["Grado"]);
        assert_eq!(q.text_matches[0].needle, "ing");
    }

    #[test]
    fn test_title_states_become_membership_clause() {
        let q = compile(&criteria(&[(
            "titleStates",
            r#"{"V": true, "A": true, "B": false}"#,
        )]))
        .unwrap();
        assert_eq!(q.clause_count, 1);
        assert!(q.sql.ends_with("WHERE title_state_code IN (?, ?)"));
        // Sorted set order
        assert_eq!(q.params, vec!["A", "V"]);
    }

    #[test]
    fn test_title_states_all_false_is_no_constraint() {
        let q = compile(&criteria(&[("titleStates", r#"{"V": false}"#)])).unwrap();
        assert!(q.is_unrestricted());

        let q = compile(&criteria(&[("titleStates", "{}")])).unwrap();
        assert!(q.is_unrestricted());
    }

    #[test]
    fn test_unparseable_title_states_is_input_error() {
        for raw in ["not json", "[\"A\"]", r#"{"A": "yes"}"#, "42"] {
            let err = compile(&criteria(&[("titleStates", raw)])).unwrap_err();
            assert!(matches!(err, ApiError::Input(_)), "value {:?}", raw);
        }
    }

    #[test]
    fn test_title_states_combine_with_fields() {
        let q = compile(&criteria(&[
            ("careerType", "Grado"),
            ("resolutionNumber", "45"),
            ("titleStates", r#"{"V": true}"#),
        ]))
        .unwrap();
        assert_eq!(q.view, TitleView::ResolutionJoined);
        assert_eq!(q.clause_count, 3);
        assert!(q.sql.ends_with(
            "WHERE career_type_name = ? AND resolution_number = ? AND title_state_code IN (?)"
        ));
        assert_eq!(q.params, vec!["Grado", "45", "V"]);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let q = compile(&criteria(&[("page", "2")])).unwrap();
        assert!(q.is_unrestricted());
    }
}
