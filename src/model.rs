//! Static resource model: table layout, field kinds, filterable columns, and
//! many-to-many links for every REST resource the service exposes.

use crate::error::ModelError;
use std::collections::HashMap;

/// Scalar kind of a declared field. Drives JSON validation, query-parameter
/// parsing, and row decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Text,
    Date,
}

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    /// Must be present and non-null on create.
    pub required: bool,
}

/// Many-to-many association materialized as a join table. The link appears in
/// API payloads as an array of related ids under `field`.
#[derive(Clone, Debug)]
pub struct LinkDef {
    pub field: String,
    pub join_table: String,
    /// Join-table column holding this resource's id.
    pub our_key: String,
    /// Join-table column holding the related resource's id.
    pub their_key: String,
    /// Path segment of the related resource (for id-existence checks).
    pub related_path: String,
}

#[derive(Clone, Debug)]
pub struct Resource {
    pub path_segment: String,
    pub table_name: String,
    pub pk_column: String,
    pub fields: Vec<FieldDef>,
    /// Columns accepted as equality-filter query parameters on list.
    pub filterable: Vec<String>,
    pub links: Vec<LinkDef>,
}

impl Resource {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` is a stored column (pk or declared field).
    pub fn has_column(&self, name: &str) -> bool {
        name == self.pk_column || self.field(name).is_some()
    }
}

#[derive(Clone, Debug)]
pub struct ResourceModel {
    pub resources: Vec<Resource>,
    by_path: HashMap<String, usize>,
}

impl ResourceModel {
    /// Build a model, checking path uniqueness, filter-field declarations,
    /// and link targets.
    pub fn new(resources: Vec<Resource>) -> Result<Self, ModelError> {
        let mut by_path = HashMap::new();
        for (i, r) in resources.iter().enumerate() {
            if by_path.insert(r.path_segment.clone(), i).is_some() {
                return Err(ModelError::DuplicatePathSegment(r.path_segment.clone()));
            }
            for f in &r.filterable {
                if !r.has_column(f) {
                    return Err(ModelError::UnknownFilterField {
                        resource: r.path_segment.clone(),
                        field: f.clone(),
                    });
                }
            }
        }
        for r in &resources {
            for l in &r.links {
                if !by_path.contains_key(&l.related_path) {
                    return Err(ModelError::UnknownLinkTarget {
                        resource: r.path_segment.clone(),
                        link: l.field.clone(),
                        related: l.related_path.clone(),
                    });
                }
            }
        }
        Ok(ResourceModel { resources, by_path })
    }

    pub fn resource_by_path(&self, path: &str) -> Option<&Resource> {
        self.by_path.get(path).map(|&i| &self.resources[i])
    }
}

fn field(name: &str, kind: FieldKind, required: bool) -> FieldDef {
    FieldDef {
        name: name.to_string(),
        kind,
        required,
    }
}

/// The student/course registry: the two resources this service serves.
pub fn registry() -> Result<ResourceModel, ModelError> {
    let students = Resource {
        path_segment: "students".into(),
        table_name: "students".into(),
        pk_column: "id".into(),
        fields: vec![
            field("name", FieldKind::Text, true),
            field("birth_date", FieldKind::Date, true),
        ],
        filterable: vec!["id".into(), "name".into()],
        links: Vec::new(),
    };
    let courses = Resource {
        path_segment: "courses".into(),
        table_name: "courses".into(),
        pk_column: "id".into(),
        fields: vec![field("name", FieldKind::Text, true)],
        filterable: vec!["id".into(), "name".into()],
        links: vec![LinkDef {
            field: "students".into(),
            join_table: "course_students".into(),
            our_key: "course_id".into(),
            their_key: "student_id".into(),
            related_path: "students".into(),
        }],
    };
    ResourceModel::new(vec![students, courses])
}
