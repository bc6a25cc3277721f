//! Per-category lead analytics

use crate::db::models::{Lead, LeadStatus};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of trailing days covered by `created_per_day`
pub const ACTIVITY_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadAnalytics {
    pub total_leads: usize,
    pub interested: usize,
    pub follow_up: usize,
    /// Mean over rated leads, 0 when none are rated
    pub average_rating: f64,
    pub status_distribution: BTreeMap<String, usize>,
    /// Index 0 holds 1-star leads, index 4 holds 5-star leads
    pub rating_distribution: [usize; 5],
    pub created_per_day: Vec<DailyCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub leads: usize,
}

/// Summarize a category's leads as of `today`
pub fn summarize(leads: &[Lead], today: NaiveDate) -> LeadAnalytics {
    let mut status_distribution = BTreeMap::new();
    let mut rating_distribution = [0usize; 5];
    let mut rating_sum = 0.0;
    let mut rated = 0usize;

    for lead in leads {
        let status = if lead.status.trim().is_empty() {
            LeadStatus::FreshLead.as_str()
        } else {
            lead.status.as_str()
        };
        *status_distribution.entry(status.to_string()).or_insert(0) += 1;

        if let Some(rating) = lead.rating.filter(|r| r.is_finite() && *r != 0.0) {
            rating_sum += rating;
            rated += 1;

            let stars = rating.floor();
            if (1.0..=5.0).contains(&stars) {
                rating_distribution[stars as usize - 1] += 1;
            }
        }
    }

    let created_per_day = (0..ACTIVITY_WINDOW_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let leads = leads
                .iter()
                .filter(|lead| lead.created_at.date_naive() == date)
                .count();
            DailyCount { date, leads }
        })
        .collect();

    LeadAnalytics {
        total_leads: leads.len(),
        interested: count_status(leads, LeadStatus::Interested),
        follow_up: count_status(leads, LeadStatus::FollowUp),
        average_rating: if rated == 0 { 0.0 } else { rating_sum / rated as f64 },
        status_distribution,
        rating_distribution,
        created_per_day,
    }
}

fn count_status(leads: &[Lead], status: LeadStatus) -> usize {
    leads.iter().filter(|lead| lead.lead_status() == Some(status)).count()
}
