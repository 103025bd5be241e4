use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Page, PageLimits, SortDirection, contains_ci, normalize_text, paginate};
use crate::model::Structure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StructureSortField {
    Name,
    City,
    Importance,
    CreatedAt,
}

impl StructureSortField {
    pub fn as_str(self) -> &'static str {
        match self {
            StructureSortField::Name => "name",
            StructureSortField::City => "city",
            StructureSortField::Importance => "importance",
            StructureSortField::CreatedAt => "createdAt",
        }
    }

    fn compare(self, a: &Structure, b: &Structure) -> Ordering {
        match self {
            StructureSortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            StructureSortField::City => a
                .address
                .city
                .to_lowercase()
                .cmp(&b.address.city.to_lowercase()),
            StructureSortField::Importance => a
                .importance
                .unwrap_or(0)
                .cmp(&b.importance.unwrap_or(0)),
            StructureSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}

impl FromStr for StructureSortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "name" => Ok(StructureSortField::Name),
            "city" => Ok(StructureSortField::City),
            "importance" => Ok(StructureSortField::Importance),
            "createdAt" => Ok(StructureSortField::CreatedAt),
            other => Err(format!("unknown sort field: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureSearchParams {
    pub query: Option<String>,
    #[serde(default)]
    pub type_ids: Vec<u64>,
    /// Exact city, case-insensitive.
    pub city: Option<String>,
    /// Substring of city, country, zip code or street.
    pub location: Option<String>,
    pub has_active_areas: Option<bool>,
    pub min_importance: Option<u32>,
    pub max_importance: Option<u32>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub sort_by: Option<StructureSortField>,
    pub sort_direction: Option<SortDirection>,
}

impl StructureSearchParams {
    pub fn matches(&self, s: &Structure) -> bool {
        if let Some(q) = normalize_text(self.query.as_deref()) {
            let in_name = contains_ci(&s.name, &q);
            let in_description = s.description.as_deref().is_some_and(|d| contains_ci(d, &q));
            if !in_name && !in_description {
                return false;
            }
        }

        if !self.type_ids.is_empty() && !s.types.iter().any(|t| self.type_ids.contains(&t.id)) {
            return false;
        }

        if let Some(city) = normalize_text(self.city.as_deref()) {
            if s.address.city.to_lowercase() != city {
                return false;
            }
        }

        if let Some(loc) = normalize_text(self.location.as_deref()) {
            let a = &s.address;
            let hit = contains_ci(&a.city, &loc)
                || contains_ci(&a.country, &loc)
                || contains_ci(&a.street, &loc)
                || a.zip_code.as_deref().is_some_and(|z| contains_ci(z, &loc));
            if !hit {
                return false;
            }
        }

        if let Some(wanted) = self.has_active_areas {
            if s.has_active_areas() != wanted {
                return false;
            }
        }

        // structures without a score never pass an importance bound
        if let Some(min) = self.min_importance {
            if s.importance.is_none_or(|i| i < min) {
                return false;
            }
        }
        if let Some(max) = self.max_importance {
            if s.importance.is_none_or(|i| i > max) {
                return false;
            }
        }

        true
    }

    pub fn sort(&self, structures: &mut [Structure]) {
        if let Some(field) = self.sort_by {
            let direction = self.sort_direction.unwrap_or_default();
            structures.sort_by(|a, b| direction.apply(field.compare(a, b)));
        }
    }

    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            pairs.push(("query".to_owned(), q.to_owned()));
        }
        for id in &self.type_ids {
            pairs.push(("typeIds".to_owned(), id.to_string()));
        }
        if let Some(city) = self.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            pairs.push(("city".to_owned(), city.to_owned()));
        }
        if let Some(location) = self.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            pairs.push(("location".to_owned(), location.to_owned()));
        }
        if let Some(active) = self.has_active_areas {
            pairs.push(("hasActiveAreas".to_owned(), active.to_string()));
        }
        if let Some(min) = self.min_importance {
            pairs.push(("minImportance".to_owned(), min.to_string()));
        }
        if let Some(max) = self.max_importance {
            pairs.push(("maxImportance".to_owned(), max.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page".to_owned(), page.max(1).saturating_sub(1).to_string()));
        }
        if let Some(size) = self.page_size {
            pairs.push(("size".to_owned(), size.to_string()));
        }
        if let (Some(field), Some(direction)) = (self.sort_by, self.sort_direction) {
            pairs.push(("sort".to_owned(), format!("{},{direction}", field.as_str())));
        }
        pairs
    }
}

pub fn search_structures(
    structures: &[Structure],
    params: &StructureSearchParams,
    limits: PageLimits,
) -> Page<Structure> {
    let mut found: Vec<Structure> = structures
        .iter()
        .filter(|s| params.matches(s))
        .cloned()
        .collect();
    params.sort(&mut found);
    let (page, size) = limits.resolve(params.page, params.page_size);
    paginate(found, page, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Address, Area, StructureType};

    fn structure(id: u64, name: &str, city: &str, importance: Option<u32>, active: bool) -> Structure {
        Structure {
            id,
            name: name.into(),
            types: vec![StructureType {
                id: id % 2 + 1,
                name: "Salle".into(),
                icon: None,
            }],
            description: Some(format!("{name} à {city}")),
            address: Address {
                country: "France".into(),
                city: city.into(),
                street: "Place Bellecour".into(),
                number: None,
                zip_code: Some("69002".into()),
            },
            areas: vec![Area {
                id: id * 10,
                name: "Grande salle".into(),
                max_capacity: 500,
                is_active: active,
                structure_id: Some(id),
                description: None,
            }],
            phone: None,
            email: None,
            website_url: None,
            socials_url: vec![],
            logo_url: None,
            importance,
            created_at: None,
            updated_at: None,
        }
    }

    fn all() -> Vec<Structure> {
        vec![
            structure(1, "Olympia", "Paris", Some(85), true),
            structure(2, "Le Transbordeur", "Lyon", Some(68), true),
            structure(3, "La Cigale", "paris", None, false),
        ]
    }

    fn ids(p: &Page<Structure>) -> Vec<u64> {
        p.items().iter().map(|s| s.id).collect()
    }

    #[test]
    fn exact_city_ignores_case() {
        let params = StructureSearchParams {
            city: Some("PARIS".into()),
            ..Default::default()
        };
        assert_eq!(ids(&search_structures(&all(), &params, PageLimits::default())), vec![1, 3]);
    }

    #[test]
    fn importance_bounds_drop_unscored() {
        let params = StructureSearchParams {
            min_importance: Some(60),
            max_importance: Some(80),
            ..Default::default()
        };
        assert_eq!(ids(&search_structures(&all(), &params, PageLimits::default())), vec![2]);
    }

    #[test]
    fn active_area_and_type_filters() {
        let inactive = StructureSearchParams {
            has_active_areas: Some(false),
            ..Default::default()
        };
        let typed = StructureSearchParams {
            type_ids: vec![1],
            ..Default::default()
        };
        assert_eq!(ids(&search_structures(&all(), &inactive, PageLimits::default())), vec![3]);
        assert_eq!(ids(&search_structures(&all(), &typed, PageLimits::default())), vec![2]);
    }

    #[test]
    fn importance_sort_treats_missing_as_zero() {
        let params = StructureSearchParams {
            sort_by: Some(StructureSortField::Importance),
            sort_direction: Some(SortDirection::Desc),
            ..Default::default()
        };
        assert_eq!(ids(&search_structures(&all(), &params, PageLimits::default())), vec![1, 2, 3]);
    }

    #[test]
    fn location_matches_zip_code() {
        let params = StructureSearchParams {
            location: Some("6900".into()),
            ..Default::default()
        };
        assert_eq!(search_structures(&all(), &params, PageLimits::default()).items().len(), 3);
    }

    #[test]
    fn query_pairs_carry_every_set_filter() {
        let params = StructureSearchParams {
            type_ids: vec![1, 3],
            location: Some(" Lyon ".into()),
            has_active_areas: Some(true),
            min_importance: Some(50),
            max_importance: Some(90),
            page: Some(2),
            page_size: Some(10),
            sort_by: Some(StructureSortField::Importance),
            sort_direction: Some(SortDirection::Desc),
            ..Default::default()
        };
        let owned = params.to_query_pairs();
        let pairs: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("typeIds", "1"),
                ("typeIds", "3"),
                ("location", "Lyon"),
                ("hasActiveAreas", "true"),
                ("minImportance", "50"),
                ("maxImportance", "90"),
                ("page", "1"),
                ("size", "10"),
                ("sort", "importance,desc"),
            ]
        );
    }
}
