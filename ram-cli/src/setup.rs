use anyhow::{Result, bail};
use rand::Rng;
use ram_core::{Classifier, HistoryStore, Language, LanguageModel, UserState};
use std::io::{self, Write};

use crate::state::open_store;

pub struct Question {
    pub q: &'static str,
    pub options: [&'static str; 4],
}

pub const QUESTIONS: [Question; 3] = [
    Question {
        q: "It's 10 AM. You have a deadline at 5 PM. What are you doing?",
        options: [
            "Staring at the wall, paralyzed by the task.",
            "Cleaning the entire kitchen instead.",
            "Working at 10x speed because the panic kicked in.",
            "Wait, I have a deadline?",
        ],
    },
    Question {
        q: "How many browser tabs do you have open right now?",
        options: [
            "Less than 5 (Liar).",
            "10-20, organized by chaos.",
            "50+, I'm afraid to close them.",
            "I opened a new window to escape the shame of the first window.",
        ],
    },
    Question {
        q: "What is your relationship with 'The Pile' (of laundry/mail/stuff)?",
        options: [
            "I am the master of The Pile.",
            "The Pile is my roommate.",
            "I moved The Pile to a chair so I could sit down.",
            "I don't see The Pile anymore. It is part of the architecture.",
        ],
    },
];

fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}

/// Map "1".."4" to an option.
fn pick_option(q: &Question, input: &str) -> Option<&'static str> {
    let n: usize = input.trim().parse().ok()?;
    q.options.get(n.checked_sub(1)?).copied()
}

fn ask(q: &Question) -> Result<&'static str> {
    println!("\n{}", q.q);
    for (i, o) in q.options.iter().enumerate() {
        println!("  {}. {}", i + 1, o);
    }
    for _ in 0..3 {
        if let Some(answer) = pick_option(q, &prompt("Choose 1-4")?) {
            return Ok(answer);
        }
        println!("Please type a number from 1 to 4.");
    }
    bail!("no valid answer given")
}

pub fn run_setup<M: LanguageModel>(classifier: &Classifier<M>) -> Result<()> {
    println!("RAM setup: let's calibrate your external brain.\n");

    let language = loop {
        let input = prompt("Language [en/es/pt/ru] (default en)")?;
        if input.is_empty() {
            break Language::En;
        }
        match input.parse::<Language>() {
            Ok(l) => break l,
            Err(e) => println!("{e}"),
        }
    };

    let name = prompt("What should I call you? (optional)")?;
    let name = if name.is_empty() { "Space Cadet".to_string() } else { name };

    let mut answers = Vec::with_capacity(QUESTIONS.len());
    for q in &QUESTIONS {
        answers.push(ask(q)?.to_string());
    }

    println!("\nAnalyzing your brain wiring...");
    let persona = classifier.generate_persona(&answers, language);
    let chaos_level = rand::thread_rng().gen_range(0..100);

    let store = open_store()?;
    let history = store.get()?;
    let mut user = UserState::new(name, language, persona, chaos_level);
    user.history = history;
    store.save_user(&user)?;

    if let Some(p) = &user.persona {
        println!("\nWelcome, {}. You are {}.", user.name, p.archetype);
        println!("{}", p.description);
        println!("Power trait: {}", p.power_trait);
        println!("Kryptonite:  {}", p.kryptonite);
    }
    println!("Chaos level: {}%", user.chaos_level);

    println!("\nNext:");
    println!("- ram dump \"call the dentist tomorrow\"");
    println!("- ram tunnel");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_one_based() {
        let q = &QUESTIONS[2];
        assert_eq!(pick_option(q, "1"), Some("I am the master of The Pile."));
        assert_eq!(pick_option(q, " 4 "), Some(q.options[3]));
        assert_eq!(pick_option(q, "0"), None);
        assert_eq!(pick_option(q, "5"), None);
        assert_eq!(pick_option(q, "two"), None);
    }
}
