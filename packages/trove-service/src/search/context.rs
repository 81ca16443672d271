use std::collections::BTreeSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month, OffsetDateTime, Time, macros::format_description};

use crate::{Error, Result};
use trove_domain::{Feature, FeatureSet, FilterKind, PermissionSet, SearchableModel, text};

/// Untyped search input as it arrives from a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
	pub q: Option<String>,
	/// `None` requests every model.
	pub models: Option<Vec<String>>,
	pub current_user_id: Option<i64>,
	pub permissions: Option<Vec<String>>,
	pub archived: Option<bool>,
	pub created_at: Option<String>,
	pub created_by: Option<Vec<i64>>,
	pub last_edited_at: Option<String>,
	pub last_edited_by: Option<Vec<i64>>,
	/// `only` or `exclude`.
	pub filter_items_in_personal_collection: Option<String>,
	pub table_db_id: Option<i64>,
	#[serde(default)]
	pub search_native_query: bool,
	#[serde(default)]
	pub model_ancestors: bool,
	#[serde(default)]
	pub verified: bool,
	pub limit: Option<u32>,
	pub offset: Option<u32>,
	/// The user is subject to row-level sandboxing or connection impersonation.
	#[serde(default)]
	pub is_sandboxed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonalScope {
	Only,
	Exclude,
}

/// Half-open timestamp range. Either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
	pub start: Option<OffsetDateTime>,
	pub end: Option<OffsetDateTime>,
}

/// Validated, read-only request descriptor.
#[derive(Debug, Clone)]
pub struct SearchContext {
	/// Normalized query, `None` when blank.
	pub search_string: Option<String>,
	/// Tokens sent to the store.
	pub tokens: Vec<String>,
	pub requested_models: Option<Vec<SearchableModel>>,
	/// Requested models that can honor every active filter. Ordered by model prior.
	pub models: BTreeSet<SearchableModel>,
	pub current_user_id: i64,
	pub permissions: PermissionSet,
	pub archived: bool,
	pub created_at: Option<DateRange>,
	pub created_by: Option<BTreeSet<i64>>,
	pub last_edited_at: Option<DateRange>,
	pub last_edited_by: Option<BTreeSet<i64>>,
	pub personal_scope: Option<PersonalScope>,
	pub table_db_id: Option<i64>,
	pub search_native_query: bool,
	pub model_ancestors: bool,
	pub verified: bool,
	pub limit: Option<u32>,
	pub offset: Option<u32>,
	pub features: FeatureSet,
	/// Sandboxing only restricts results when the sandboxes feature is enabled.
	pub is_sandboxed: bool,
	pub personal_collection_ids: BTreeSet<i64>,
}
impl SearchContext {
	pub fn needs_personal_collection_ids(&self) -> bool {
		self.personal_scope.is_some()
	}

	pub fn with_personal_collection_ids(mut self, ids: BTreeSet<i64>) -> Self {
		self.personal_collection_ids = ids;

		self
	}
}

pub fn validate(
	request: SearchRequest,
	features: &FeatureSet,
	now: OffsetDateTime,
) -> Result<SearchContext> {
	let Some(current_user_id) = request.current_user_id else {
		return Err(Error::Unauthenticated {
			message: "A current user is required to search.".to_string(),
		});
	};

	if current_user_id <= 0 {
		return Err(Error::InvalidRequest {
			message: "current_user_id must be positive.".to_string(),
		});
	}

	let Some(paths) = request.permissions else {
		return Err(Error::InvalidRequest {
			message: "permissions must be supplied by the caller.".to_string(),
		});
	};

	if request.verified && !features.has(Feature::ContentVerification) {
		return Err(Error::FeatureDisabled {
			feature: Feature::ContentVerification.as_str().to_string(),
		});
	}

	let requested_models = match request.models {
		Some(raw) => Some(parse_models(&raw)?),
		None => None,
	};
	let personal_scope = match request.filter_items_in_personal_collection.as_deref() {
		None => None,
		Some(raw) => Some(match raw.trim() {
			"only" => PersonalScope::Only,
			"exclude" => PersonalScope::Exclude,
			other => {
				return Err(Error::InvalidRequest {
					message: format!(
						"filter_items_in_personal_collection must be only or exclude, got {other:?}."
					),
				});
			},
		}),
	};
	let created_at = match request.created_at.as_deref() {
		Some(raw) => Some(parse_date_range(raw, now)?),
		None => None,
	};
	let last_edited_at = match request.last_edited_at.as_deref() {
		Some(raw) => Some(parse_date_range(raw, now)?),
		None => None,
	};
	let search_string = request
		.q
		.as_deref()
		.map(text::normalize)
		.filter(|normalized| !normalized.is_empty());
	let tokens = search_string.as_deref().map(text::tokenize).unwrap_or_default();
	let mut ctx = SearchContext {
		search_string,
		tokens,
		requested_models,
		models: BTreeSet::new(),
		current_user_id,
		permissions: PermissionSet::parse(paths),
		archived: request.archived.unwrap_or(false),
		created_at,
		created_by: request.created_by.filter(|ids| !ids.is_empty()).map(BTreeSet::from_iter),
		last_edited_at,
		last_edited_by: request
			.last_edited_by
			.filter(|ids| !ids.is_empty())
			.map(BTreeSet::from_iter),
		personal_scope,
		table_db_id: request.table_db_id,
		search_native_query: request.search_native_query,
		model_ancestors: request.model_ancestors,
		verified: request.verified,
		limit: request.limit,
		offset: request.offset,
		features: features.clone(),
		is_sandboxed: request.is_sandboxed && features.has(Feature::Sandboxes),
		personal_collection_ids: BTreeSet::new(),
	};

	ctx.models = applicable_models(&ctx);

	Ok(ctx)
}

/// Narrow the requested models to those able to honor every active filter.
pub fn applicable_models(ctx: &SearchContext) -> BTreeSet<SearchableModel> {
	let mut active = Vec::new();

	if ctx.archived {
		active.push(FilterKind::Archived);
	}
	if ctx.created_at.is_some() {
		active.push(FilterKind::CreatedAt);
	}
	if ctx.created_by.is_some() {
		active.push(FilterKind::CreatedBy);
	}
	if ctx.last_edited_at.is_some() {
		active.push(FilterKind::LastEditedAt);
	}
	if ctx.last_edited_by.is_some() {
		active.push(FilterKind::LastEditedBy);
	}
	if ctx.verified {
		active.push(FilterKind::Verified);
	}
	if ctx.table_db_id.is_some() {
		active.push(FilterKind::DatabaseId);
	}
	if ctx.personal_scope == Some(PersonalScope::Only) {
		active.push(FilterKind::OnlyPersonalCollections);
	}

	let requested = match &ctx.requested_models {
		Some(models) => models.clone(),
		None => SearchableModel::ALL.to_vec(),
	};

	requested.into_iter().filter(|model| active.iter().all(|kind| model.supports(*kind))).collect()
}

fn parse_models(raw: &[String]) -> Result<Vec<SearchableModel>> {
	let mut out = Vec::with_capacity(raw.len());

	for name in raw {
		let Some(model) = SearchableModel::parse(name) else {
			return Err(Error::InvalidRequest { message: format!("Unknown model {name:?}.") });
		};

		if !out.contains(&model) {
			out.push(model);
		}
	}

	Ok(out)
}

/// Parse a date filter relative to `now` (UTC).
///
/// Accepted forms: `YYYY-MM-DD`, `start~end` with either side optional, `past<N><unit>s` with
/// an optional trailing `~` to include the current unit, `this<unit>`, `today` and `yesterday`.
/// Units are `day`, `week`, `month` and `year`; weeks start on Monday.
pub fn parse_date_range(raw: &str, now: OffsetDateTime) -> Result<DateRange> {
	let raw = raw.trim();
	let today = now.date();
	let invalid = || Error::InvalidRequest { message: format!("Unsupported date filter {raw:?}.") };

	match raw {
		"today" => return Ok(days(today, 1)),
		"yesterday" => return Ok(days(today.previous_day().ok_or_else(invalid)?, 1)),
		_ => {},
	}

	if let Some(unit) = raw.strip_prefix("this") {
		let unit = parse_unit(unit).ok_or_else(invalid)?;
		let start = unit_start(today, unit);
		let end = shift(start, unit, 1).ok_or_else(invalid)?;

		return Ok(range(start, end));
	}

	let relative = Regex::new(r"^past(\d+)(day|week|month|year)s(~?)$")
		.map_err(|err| Error::InvalidRequest { message: err.to_string() })?;

	if let Some(captures) = relative.captures(raw) {
		let amount: i32 = captures[1].parse().map_err(|_| invalid())?;
		let unit = parse_unit(&captures[2]).ok_or_else(invalid)?;
		let current = unit_start(today, unit);
		let start = shift(current, unit, -amount).ok_or_else(invalid)?;
		let end = if captures[3].is_empty() {
			current
		} else {
			shift(current, unit, 1).ok_or_else(invalid)?
		};

		return Ok(range(start, end));
	}

	if let Some((start, end)) = raw.split_once('~') {
		let start = match start.trim() {
			"" => None,
			value => Some(parse_day(value).ok_or_else(invalid)?),
		};
		let end = match end.trim() {
			"" => None,
			value => Some(parse_day(value).ok_or_else(invalid)?.next_day().ok_or_else(invalid)?),
		};

		if start.is_none() && end.is_none() {
			return Err(invalid());
		}

		return Ok(DateRange { start: start.map(midnight), end: end.map(midnight) });
	}

	parse_day(raw).map(|day| days(day, 1)).ok_or_else(invalid)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
	Day,
	Week,
	Month,
	Year,
}

fn parse_unit(raw: &str) -> Option<Unit> {
	match raw {
		"day" => Some(Unit::Day),
		"week" => Some(Unit::Week),
		"month" => Some(Unit::Month),
		"year" => Some(Unit::Year),
		_ => None,
	}
}

fn parse_day(raw: &str) -> Option<Date> {
	if raw.len() != 10 {
		return None;
	}

	Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()
}

fn unit_start(day: Date, unit: Unit) -> Date {
	match unit {
		Unit::Day => day,
		Unit::Week => day - Duration::days(i64::from(day.weekday().number_days_from_monday())),
		Unit::Month => day.replace_day(1).unwrap_or(day),
		Unit::Year => Date::from_calendar_date(day.year(), Month::January, 1).unwrap_or(day),
	}
}

fn shift(day: Date, unit: Unit, amount: i32) -> Option<Date> {
	match unit {
		Unit::Day => day.checked_add(Duration::days(i64::from(amount))),
		Unit::Week => day.checked_add(Duration::weeks(i64::from(amount))),
		Unit::Month => shift_months(day, amount),
		Unit::Year => shift_months(day, amount.checked_mul(12)?),
	}
}

fn shift_months(day: Date, amount: i32) -> Option<Date> {
	let index = day.year().checked_mul(12)? + i32::from(u8::from(day.month())) - 1 + amount;
	let year = index.div_euclid(12);
	let month = Month::try_from(u8::try_from(index.rem_euclid(12) + 1).ok()?).ok()?;
	let max_day = time::util::days_in_year_month(year, month);

	Date::from_calendar_date(year, month, day.day().min(max_day)).ok()
}

fn midnight(day: Date) -> OffsetDateTime {
	day.with_time(Time::MIDNIGHT).assume_utc()
}

fn range(start: Date, end: Date) -> DateRange {
	DateRange { start: Some(midnight(start)), end: Some(midnight(end)) }
}

fn days(start: Date, count: i64) -> DateRange {
	let end = start.checked_add(Duration::days(count)).unwrap_or(start);

	range(start, end)
}
