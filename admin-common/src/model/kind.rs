//! Entity kinds and their static field tables

use super::schema::{FieldDefault as D, FieldSpec, FieldType as T};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Course subjects offered on the site
pub const COURSE_SUBJECTS: &[&str] = &[
    "Mathematics",
    "Physics",
    "Chemistry",
    "Biology",
    "English",
    "Computer Science",
    "History",
    "Geography",
];

pub const COURSE_LEVELS: &[&str] = &["beginner", "intermediate", "advanced"];
pub const TESTIMONIAL_TYPES: &[&str] = &["general", "course", "service"];
pub const EMPLOYMENT_TYPES: &[&str] = &["full-time", "part-time", "contract", "freelance"];

/// Upper sanity bound for course prices
pub const PRICE_MAX: f64 = 99_999.0;

const ID: FieldSpec = FieldSpec::new("id", T::Id);
const CREATED_AT: FieldSpec = FieldSpec::new("created_at", T::Timestamp);
const UPDATED_AT: FieldSpec = FieldSpec::new("updated_at", T::Timestamp);

const fn text(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, T::Text)
}

const fn url(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, T::Url)
}

const fn flag(name: &'static str, default: bool) -> FieldSpec {
    FieldSpec::new(name, T::Bool).with_default(D::Bool(default))
}

const fn list(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, T::TextList).with_default(D::List(&[]))
}

static BLOG_FIELDS: &[FieldSpec] = &[
    ID,
    text("title").required(),
    text("content").required(),
    text("excerpt"),
    text("author_name").with_default(D::Text("Admin")),
    text("category").with_default(D::Text("General")),
    list("tags"),
    url("featured_image_url"),
    text("meta_title"),
    text("meta_description"),
    flag("is_published", true),
    text("status").with_default(D::Text("published")),
    CREATED_AT,
    UPDATED_AT,
];

static COURSE_FIELDS: &[FieldSpec] = &[
    ID,
    text("title").required().min_len(3),
    text("description").required().min_len(10),
    text("subject").one_of(COURSE_SUBJECTS),
    text("level").one_of(COURSE_LEVELS),
    text("grade_level"),
    FieldSpec::new("duration_weeks", T::Integer),
    text("course_duration"),
    FieldSpec::new("price", T::Real)
        .with_default(D::Real(0.0))
        .range(0.0, PRICE_MAX),
    text("target_audience"),
    text("instructor_name"),
    text("instructor_bio"),
    url("image_url"),
    flag("is_published", false),
    flag("is_featured", false),
    text("created_by").with_default(D::Text("admin")),
    CREATED_AT,
    UPDATED_AT,
];

static TESTIMONIAL_FIELDS: &[FieldSpec] = &[
    ID,
    text("client_name").required(),
    text("client_title"),
    text("client_company"),
    url("client_avatar_url"),
    text("testimonial_text").required(),
    FieldSpec::new("rating", T::Integer)
        .with_default(D::Integer(5))
        .range(1.0, 5.0),
    text("testimonial_type")
        .with_default(D::Text("general"))
        .one_of(TESTIMONIAL_TYPES),
    FieldSpec::new("target_pages", T::TextList).with_default(D::List(&["homepage"])),
    FieldSpec::new("display_order", T::Integer).with_default(D::Integer(0)),
    flag("is_featured", false),
    flag("is_visible", true),
    text("client_location"),
    url("client_website"),
    text("project_details"),
    text("client_industry"),
    text("verification_status").with_default(D::Text("pending")),
    CREATED_AT,
    UPDATED_AT,
];

static JOB_FIELDS: &[FieldSpec] = &[
    ID,
    text("title").required(),
    text("company_name").required(),
    url("company_logo_url"),
    text("location").required(),
    flag("is_remote", false),
    text("employment_type")
        .with_default(D::Text("full-time"))
        .one_of(EMPLOYMENT_TYPES),
    text("experience_level").with_default(D::Text("mid-level")),
    FieldSpec::new("salary_min", T::Integer),
    FieldSpec::new("salary_max", T::Integer),
    text("salary_currency").with_default(D::Text("USD")),
    text("salary_period").with_default(D::Text("year")),
    text("description").required(),
    list("requirements"),
    list("skills"),
    list("responsibilities"),
    list("benefits"),
    text("application_deadline"),
    text("contact_email"),
    url("application_url"),
    text("application_instructions"),
    flag("is_featured", false),
    flag("is_active", true),
    flag("is_published", true),
    text("category"),
    text("industry"),
    CREATED_AT,
    UPDATED_AT,
];

/// Entity kind managed by the admin backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Blog,
    Course,
    Testimonial,
    Job,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Kind::Blog, Kind::Course, Kind::Testimonial, Kind::Job];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Blog => "blog",
            Kind::Course => "course",
            Kind::Testimonial => "testimonial",
            Kind::Job => "job",
        }
    }

    /// Backing table name
    pub fn table(&self) -> &'static str {
        match self {
            Kind::Blog => "blog_posts",
            Kind::Course => "courses",
            Kind::Testimonial => "testimonials",
            Kind::Job => "jobs",
        }
    }

    /// Field echoed back in create responses alongside the id
    pub fn label_field(&self) -> &'static str {
        match self {
            Kind::Testimonial => "client_name",
            _ => "title",
        }
    }

    /// The two text columns searched (OR-combined) by free-text queries
    pub fn search_fields(&self) -> [&'static str; 2] {
        match self {
            Kind::Blog => ["title", "content"],
            Kind::Course => ["title", "description"],
            Kind::Testimonial => ["client_name", "testimonial_text"],
            Kind::Job => ["title", "description"],
        }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            Kind::Blog => BLOG_FIELDS,
            Kind::Course => COURSE_FIELDS,
            Kind::Testimonial => TESTIMONIAL_FIELDS,
            Kind::Job => JOB_FIELDS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Plural collection name used in URL paths (`/api/courses`)
    pub fn collection(&self) -> &'static str {
        match self {
            Kind::Blog => "blogs",
            Kind::Course => "courses",
            Kind::Testimonial => "testimonials",
            Kind::Job => "jobs",
        }
    }

    /// Parse a plural collection path segment
    pub fn from_collection(segment: &str) -> Option<Kind> {
        Kind::ALL.into_iter().find(|k| k.collection() == segment)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .or_else(|| Kind::from_collection(s))
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_kind_has_system_fields_and_unique_names() {
        for kind in Kind::ALL {
            let names: HashSet<_> = kind.fields().iter().map(|f| f.name).collect();
            assert_eq!(names.len(), kind.fields().len(), "duplicate field in {}", kind);
            for required in ["id", "created_at", "updated_at", kind.label_field()] {
                assert!(names.contains(required), "{} lacks {}", kind, required);
            }
            for search in kind.search_fields() {
                assert!(names.contains(search));
            }
        }
    }

    #[test]
    fn test_parse_kind_from_singular_and_plural() {
        assert_eq!("course".parse::<Kind>(), Ok(Kind::Course));
        assert_eq!("testimonials".parse::<Kind>(), Ok(Kind::Testimonial));
        assert_eq!(Kind::from_collection("blogs"), Some(Kind::Blog));
        assert!("instagram".parse::<Kind>().is_err());
    }

    #[test]
    fn test_required_fields_per_kind() {
        let required = |k: Kind| -> Vec<&str> {
            k.fields().iter().filter(|f| f.required).map(|f| f.name).collect()
        };
        assert_eq!(required(Kind::Blog), ["title", "content"]);
        assert_eq!(required(Kind::Course), ["title", "description"]);
        assert_eq!(required(Kind::Testimonial), ["client_name", "testimonial_text"]);
        assert_eq!(
            required(Kind::Job),
            ["title", "company_name", "location", "description"]
        );
    }
}
