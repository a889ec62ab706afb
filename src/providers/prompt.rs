//! Prompt construction for the draft generator
//!
//! The output schema block is the contract with [`crate::parser`]: the model
//! is told to emit exactly the JSON shape the lenient parser accepts.

use crate::models::{GenerationConstraints, Strategy};

/// JSON shape the generator must emit for a single itinerary
const OUTPUT_SCHEMA: &str = r#"{
  "startingPoint": string,
  "tripLengthDays": number,
  "strategy": "STRATEGY",
  "plan": [
    {
      "city": string,
      "country": string,
      "days": number,
      "transportFromPreviousCity": "train | bus | flight | ferry | none"
    }
  ]
}"#;

/// Render the full instruction block for one generation round
#[must_use]
pub fn build_prompt(constraints: &GenerationConstraints) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "SYSTEM:\n\
         You are a travel planning AI.\n\
         DO NOT estimate prices.\n\
         DO NOT mention costs.\n\
         DO NOT add activities.\n\
         ONLY decide cities, order, transport type, and number of days.\n\n",
    );

    prompt.push_str(&format!(
        "USER:\n\
         Starting point: {}\n\
         Trip length: {} days\n\
         Preferences: {:?}\n\n",
        constraints.starting_point, constraints.travel_length, constraints.preferences
    ));

    match constraints.strategy {
        Strategy::Visited => {
            prompt.push_str(&format!(
                "Constraint:\n\
                 ONLY choose destinations from this list:\n\
                 {:?}\n\n\
                 TASK:\n\
                 Generate a realistic draft itinerary.\n\n",
                constraints.visited_places
            ));
        }
        Strategy::Unvisited => {
            prompt.push_str(&format!(
                "Constraint:\n\
                 EXCLUDE the following places completely:\n\
                 {:?}\n\n\
                 TASK:\n\
                 Generate a realistic draft itinerary using ONLY new destinations.\n\n",
                constraints.visited_places
            ));
        }
        Strategy::Random => {
            prompt.push_str(
                "TASK:\n\
                 Generate a realistic random European itinerary.\n\n",
            );
        }
    }

    prompt.push_str(&format!(
        "Rules:\n\
         - Use the starting point only as a transport hub.\n\
         - Choose geographically reasonable routes.\n\
         - Sum of days MUST equal {}.\n\
         - At the end of the trip, return to the starting point.\n\n",
        constraints.travel_length
    ));

    let schema = OUTPUT_SCHEMA.replace("STRATEGY", &constraints.strategy.to_string());
    if constraints.candidates > 1 {
        prompt.push_str(&format!(
            "OUTPUT:\n\
             Return JSON ONLY: a JSON array of exactly {} alternative itineraries,\n\
             each using this structure:\n\n{schema}\n",
            constraints.candidates
        ));
    } else {
        prompt.push_str(&format!(
            "OUTPUT:\n\
             Return JSON ONLY using this structure:\n\n{schema}\n"
        ));
    }

    prompt
}
