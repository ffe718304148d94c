//! The `clbprep init` command.

use std::path::Path;

use anyhow::{Context, Result};

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("clbprep.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("submissions")?;
    for (name, content) in SAMPLE_SUBMISSIONS {
        write_if_missing(&Path::new("submissions").join(name), content)?;
    }

    println!("\nNext steps:");
    println!("  1. Edit clbprep.toml with your API keys");
    println!("  2. Run: clbprep validate reading --input submissions/reading-sample.json");
    println!("  3. Run: clbprep assess reading --input submissions/reading-sample.json");
    println!("  4. Run: clbprep batch --dir submissions");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# clbprep configuration

default_provider = "openai"
default_model = "gpt-4.1-mini"
temperature = 0.2
max_tokens = 2048

# Retries on rate limits and timeouts (0 = single attempt).
max_retries = 0
retry_delay_ms = 1000

# Skills answered with canned feedback instead of a model call.
# Only "speaking" and "writing" have offline feedback.
offline = []

# Concurrent assessments for `clbprep batch`.
parallelism = 4

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.anthropic]
type = "anthropic"
api_key = "${ANTHROPIC_API_KEY}"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"
"#;

const SAMPLE_SUBMISSIONS: [(&str, &str); 4] = [
    (
        "speaking-sample.json",
        r#"{
  "audioDataUri": "data:audio/webm;base64,GkXfo59ChoEBQveBAULygQRC84EIQoKEd2VibUKHgQRChYECGFOAZwEAAAAAAAAA",
  "promptText": "Parlez de votre dernier voyage. Où êtes-vous allé et qu'avez-vous fait ?"
}
"#,
    ),
    (
        "writing-sample.json",
        r#"{
  "promptText": "Écrivez un courriel à votre propriétaire pour signaler un problème de chauffage.",
  "responseText": "Bonjour Monsieur Tremblay,\n\nJe vous écris parce que le chauffage de mon appartement ne fonctionne plus depuis trois jours. Il fait très froid le soir et mes enfants sont malades. Pourriez-vous envoyer un technicien cette semaine ?\n\nCordialement,\nAmina"
}
"#,
    ),
    (
        "reading-sample.json",
        r#"{
  "passageText": "La ville de Québec offre des cours de français gratuits aux nouveaux arrivants. Les cours ont lieu le soir, du lundi au jeudi, pour permettre aux participants de travailler pendant la journée. L'inscription se fait en ligne ou au centre communautaire.",
  "studentResponseText": "Les cours sont gratuits et ils sont le soir, quatre jours par semaine. On peut s'inscrire sur internet ou au centre communautaire.",
  "section": "Section A",
  "difficulty": "B1"
}
"#,
    ),
    (
        "listening-sample.json",
        r#"{
  "transcriptText": "Bonjour, ici la clinique Saint-Laurent. Votre rendez-vous de mardi est déplacé à jeudi, dix heures. Merci d'arriver quinze minutes en avance avec votre carte d'assurance maladie.",
  "studentResponseText": "Le rendez-vous est changé pour jeudi à dix heures. Il faut arriver quinze minutes avant avec la carte d'assurance maladie."
}
"#,
    ),
];
