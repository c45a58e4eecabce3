//! Predefined subcategory taxonomy
//!
//! Baseline entries for each topic, with descriptions and the alias
//! keywords the rule-based classifier matches against. Deployments start
//! from this set; classification grows it from there.

use crate::types::{Subcategory, Topic};

/// (canonical name, description, aliases)
type SeedRow = (&'static str, &'static str, &'static [&'static str]);

const TRAFFIC: &[SeedRow] = &[
    ("accident", "Vehicle accidents and collisions", &["collision", "crash"]),
    ("congestion", "Traffic jams and slow movement", &["jam", "traffic_jam", "gridlock"]),
    ("closure", "Road closures and blockages", &["closed", "blocked", "blockage"]),
    ("construction", "Road work and maintenance", &["roadwork", "repair_work"]),
    ("breakdown", "Vehicle breakdowns", &["stalled"]),
    ("signal_issue", "Traffic signal problems", &["signal", "traffic_signal"]),
];

const INFRASTRUCTURE: &[SeedRow] = &[
    ("power_outage", "Electricity supply disruption", &["power", "electricity", "blackout"]),
    ("water_supply", "Water availability issues", &["water", "pipeline"]),
    ("road_damage", "Damaged roads and potholes", &["pothole", "potholes"]),
    ("maintenance", "Scheduled infrastructure work", &["repair"]),
    ("network_issue", "Internet and telecom problems", &["internet", "telecom", "network"]),
    ("waste_management", "Garbage collection issues", &["garbage", "trash", "waste"]),
];

const WEATHER: &[SeedRow] = &[
    ("rain", "Rainfall and precipitation", &["rainfall", "drizzle"]),
    ("flood", "Waterlogging and flooding", &["flooding", "waterlogging"]),
    ("storm", "Severe weather conditions", &["thunderstorm", "thunder", "lightning"]),
    ("heat", "High temperature conditions", &["heatwave", "hot"]),
    ("wind", "Strong wind conditions", &["windy", "gale"]),
    ("fog", "Low visibility due to fog", &["mist", "haze"]),
];

const EVENTS: &[SeedRow] = &[
    ("cultural", "Cultural festivals and celebrations", &["festival", "celebration"]),
    ("sports", "Sports events and competitions", &["match", "tournament"]),
    ("tech", "Technology events and meetups", &["meetup", "conference", "hackathon"]),
    ("music", "Concerts and musical events", &["concert", "gig"]),
    ("political", "Political rallies and meetings", &["rally", "protest"]),
    ("religious", "Religious gatherings and festivals", &["procession"]),
];

const SAFETY: &[SeedRow] = &[
    ("fire", "Fire emergencies and incidents", &["blaze", "smoke"]),
    ("emergency", "General emergency situations", &["sos"]),
    ("security", "Security and safety concerns", &["suspicious"]),
    ("medical", "Medical emergencies", &["ambulance", "injury"]),
    ("crime", "Criminal activities", &["theft", "robbery"]),
    ("accident", "Safety-related accidents", &["mishap"]),
];

fn rows(topic: Topic) -> &'static [SeedRow] {
    match topic {
        Topic::Traffic => TRAFFIC,
        Topic::Infrastructure => INFRASTRUCTURE,
        Topic::Weather => WEATHER,
        Topic::Events => EVENTS,
        Topic::Safety => SAFETY,
    }
}

/// Build the full predefined taxonomy, in `PendingReview` status; callers
/// decide whether to activate on seed
pub fn predefined() -> Vec<Subcategory> {
    let mut entries = Vec::new();
    for topic in Topic::ALL {
        for (name, description, aliases) in rows(topic) {
            let mut entry = Subcategory::new(
                topic,
                *name,
                crate::classify::naming::display_name_from(name),
                Some((*description).to_string()),
            );
            entry.aliases = aliases.iter().map(|a| a.to_string()).collect();
            entries.push(entry);
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_topic_seeded() {
        let entries = predefined();
        for topic in Topic::ALL {
            assert!(entries.iter().any(|e| e.topic == topic));
        }
    }

    #[test]
    fn test_no_intra_topic_alias_collisions() {
        let entries = predefined();
        for topic in Topic::ALL {
            let mut seen: HashSet<&str> = HashSet::new();
            for entry in entries.iter().filter(|e| e.topic == topic) {
                assert!(
                    seen.insert(entry.canonical_name.as_str()),
                    "{}",
                    entry.canonical_name
                );
                for alias in &entry.aliases {
                    assert!(seen.insert(alias.as_str()), "{topic}/{alias}");
                }
            }
        }
    }
}
