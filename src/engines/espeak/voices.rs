use crate::EngineVoice;

const DEFAULT_PRIORITY: u8 = 5;

/// Parse the table printed by `espeak-ng --voices`.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  2  en-us           --/M      English_(America)  gmw/en-US            (en 3)
/// ```
///
/// Languages are encoded the way the espeak-ng library reports them: a
/// priority byte, the language name and a NUL, repeated per language.
pub fn parse_voice_table(output: &str) -> Vec<EngineVoice> {
    output.lines().filter_map(parse_voice_line).collect()
}

fn parse_voice_line(line: &str) -> Option<EngineVoice> {
    let mut fields = line.split_whitespace();
    let priority = fields.next()?.parse::<u8>().ok()?;
    let language = fields.next()?;
    let (age, gender) = parse_age_gender(fields.next()?);
    let name = fields.next()?.replace('_', " ");
    let identifier = fields.next()?.to_string();

    let mut languages = Vec::new();
    push_language(&mut languages, priority, language);
    // Remaining columns are `(language priority)` pairs.
    let others: Vec<&str> = fields.map(|f| f.trim_matches(['(', ')'])).collect();
    for pair in others.chunks(2) {
        let priority = pair
            .get(1)
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PRIORITY);
        push_language(&mut languages, priority, pair[0]);
    }

    Some(EngineVoice {
        name,
        identifier,
        languages: String::from_utf8_lossy(&languages).into_owned(),
        gender,
        age,
    })
}

fn push_language(out: &mut Vec<u8>, priority: u8, language: &str) {
    out.push(priority);
    out.extend_from_slice(language.as_bytes());
    out.push(0);
}

/// `--/M` style column: age (or `--`) and gender letter.
fn parse_age_gender(field: &str) -> (u8, u8) {
    let (age, gender) = field.split_once('/').unwrap_or((field, ""));
    let age = age.parse().unwrap_or(0);
    let gender = match gender {
        "M" => 1,
        "F" => 2,
        _ => 0,
    };
    (age, gender)
}

/// Parse the table printed by `espeak-ng --voices=variant` into sorted
/// variant names.
pub fn parse_variant_table(output: &str) -> Vec<String> {
    let mut variants: Vec<String> = output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            fields.next()?.parse::<u8>().ok()?;
            let file = fields.nth(3)?;
            let name = file.rsplit('/').next()?;
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect();
    variants.sort();
    variants.dedup();
    variants
}
