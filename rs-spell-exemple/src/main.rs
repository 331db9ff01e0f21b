use log::info;

use rs_spell_core::io::{read_file, tokenize};
use rs_spell_core::model::language_model::{LanguageModel, TokenUnit};
use rs_spell_core::model::smoothing::Smoothing;
use rs_spell_core::{CorrectionStatus, CorrectorConfig, ModelConfig, NoisyChannelCorrector, SpellModel};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Train from "data/english.dat" (one sentence per line), with the optional
    // "english.voc" vocabulary and "english.err" error pairs next to it.
    // A "english.bin" cache is written and reused on the next run.
    let mut model_config = ModelConfig::default();

    // Order of the language model: 2 (bigram) or 3 (trigram)
    model_config.set_order(3)?;

    // Interpolation weights are given for unigrams, bigrams and trigrams
    model_config.set_smoothing(Smoothing::Interpolated { weights: [0.1, 0.3, 0.6], k: 0.5 })?;

    // Invalid settings are rejected
    match model_config.set_order(5) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Order 5 is invalid: {e}"),
    }

    let model = SpellModel::new("./data/english.dat", &model_config)?;
    info!("model '{}' ready, {} known words", model.name(), model.vocabulary().len());

    // Words more than 'max_edit_distance' edits away from every known word are left untouched
    let mut config = CorrectorConfig::default();
    config.set_max_edit_distance(2)?;

    // How many ranked candidates to report per word
    config.set_top_k(3)?;

    // Keep a known word unless a competitor scores better by more than this margin (natural log)
    config.set_tolerance(0.0)?;

    let corrector = NoisyChannelCorrector::new(&model, config)?;

    let text = "The cat sqt on teh mat.\nA dgo ran in the prak.\nThe xyzzyq sat.";
    for line in text.lines() {
        let tokens = tokenize(line)?;
        let results = corrector.correct_sentence(&tokens)?;

        let corrected: Vec<&str> = results.iter().map(|r| r.final_word.as_str()).collect();
        println!("{line}\n  -> {}", corrected.join(" "));

        for result in &results {
            match result.status {
                CorrectionStatus::Corrected => {
                    let candidates: Vec<String> = result
                        .candidates
                        .iter()
                        .map(|c| format!("{} ({:.2})", c.word, c.score))
                        .collect();
                    println!("     {} -> {} [{}]", result.original, result.final_word, candidates.join(", "));
                }
                CorrectionStatus::Uncorrectable => println!("     {} is unknown and has no close word", result.original),
                CorrectionStatus::AcceptedOriginal => (),
            }
        }
        println!("  log-likelihood: {:.3}", corrector.score_sentence(&corrected)?);
    }

    // Generate a few sentences from the language model
    let mut rng = rand::rng();
    for i in 0..3 {
        let sentence = model.language_model().generate(&["the"], 12, &mut rng);
        println!("Generated sentence {}: {}", i + 1, sentence.join(" "));
    }

    // The same corpus as a character trigram model
    let lines = read_file("./data/english.dat")?;
    let chars = LanguageModel::train_text(&lines, TokenUnit::Char, 3, Smoothing::default())?;
    println!("Character model log-likelihood of 'the cat': {:.3}", chars.evaluate_text("the cat")?);
    println!("Character model log-likelihood of 'teh cta': {:.3}", chars.evaluate_text("teh cta")?);
    println!("Generated characters: {}", chars.generate_text("the", 60, &mut rng)?);

    Ok(())
}
