//! Static worker table used when the live directory has nothing to offer.

use std::collections::BTreeMap;

use super::Worker;

/// (category, name, location, rating, hourly rate, experience)
const FALLBACK_ROWS: &[(&str, &str, &str, f64, f64, &str)] = &[
    ("plumber", "Ramesh", "Mumbai", 4.7, 45.0, "8 years exp."),
    ("electrician", "Suresh", "Delhi", 4.5, 50.0, "6 years exp."),
    ("ac_technician", "Amit", "Bangalore", 4.6, 55.0, "5 years exp."),
    ("carpenter", "Vikram", "Chennai", 4.8, 40.0, "12 years exp."),
    ("appliance_repair", "Sunil", "Pune", 4.4, 35.0, "4 years exp."),
    ("glazier", "Anil", "Hyderabad", 4.7, 42.0, "7 years exp."),
    ("cleaning", "Meena", "Kolkata", 4.5, 25.0, "3 years exp."),
    ("computer_repair", "Rohit", "Bangalore", 4.6, 60.0, "5 years exp."),
    ("general_contractor", "Deepak", "Delhi", 4.6, 55.0, "10 years exp."),
    ("mobile_repair", "Aakash", "Mumbai", 4.5, 30.0, "4 years exp."),
    ("pest_control", "Kiran", "Chennai", 4.7, 45.0, "6 years exp."),
    ("home_automation", "Ananya", "Bangalore", 4.6, 70.0, "5 years exp."),
    ("solar_technician", "Rajat", "Pune", 4.8, 65.0, "7 years exp."),
    ("specialized_services", "Sneha", "Delhi", 4.6, 50.0, "8 years exp."),
    ("gas_technician", "Manish", "Chennai", 4.5, 48.0, "6 years exp."),
    ("automobile_mechanic", "Ajay", "Mumbai", 4.6, 55.0, "9 years exp."),
    ("locksmith", "Vikas", "Delhi", 4.5, 35.0, "5 years exp."),
    ("welder", "Ravi", "Bangalore", 4.7, 50.0, "8 years exp."),
];

/// Workers keyed by category.
#[derive(Debug, Clone)]
pub struct FallbackTable {
    by_category: BTreeMap<String, Vec<Worker>>,
}

impl FallbackTable {
    pub fn new(workers: impl IntoIterator<Item = Worker>) -> Self {
        let mut by_category: BTreeMap<String, Vec<Worker>> = BTreeMap::new();
        for worker in workers {
            by_category
                .entry(worker.category.clone())
                .or_default()
                .push(worker);
        }
        Self { by_category }
    }

    /// Workers for `category`; unknown categories yield an empty list.
    pub fn get(&self, category: &str) -> Vec<Worker> {
        self.by_category.get(category).cloned().unwrap_or_default()
    }

    /// Every worker, grouped by category in key order.
    pub fn all(&self) -> impl Iterator<Item = &Worker> {
        self.by_category.values().flatten()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.by_category.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_category.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FallbackTable {
    fn default() -> Self {
        Self::new(fallback_workers())
    }
}

/// The built-in fallback workers, one per service category.
pub fn fallback_workers() -> Vec<Worker> {
    FALLBACK_ROWS
        .iter()
        .map(
            |&(category, name, location, rating, hourly_rate, experience)| Worker {
                id: None,
                name: name.to_string(),
                location: location.to_string(),
                rating,
                hourly_rate,
                experience: experience.to_string(),
                category: category.to_string(),
                verified: true,
            },
        )
        .collect()
}
