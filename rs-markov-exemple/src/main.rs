use rs_markov_core::model::markov::MarkovModel;
use rs_markov_core::model::options::{GenerateOptions, MarkovOptions, Seed};
use rs_markov_core::MarkovError;

const TEXT: &str = "The quick fox jumps over the lazy dog. The lazy dog sleeps under the old tree. \
    The old tree stands near the quiet river. A quiet river runs past the small house. \
    The small house sits on the green hill. A green hill rises over the quiet valley. \
    The dog runs over the green hill. The fox sleeps near the small house.";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Order 3: every token is predicted from the two previous ones.
    // Generated text may not share more than 5 tokens in a row with the input.
    let options = MarkovOptions {
        max_length_match: Some(5),
        ..Default::default()
    };

    // Load "./data/<name>.txt" when given (cached next to it as .bin),
    // otherwise train on the embedded text
    let mut model = match std::env::args().nth(1) {
        Some(path) => MarkovModel::from_file(path, 3, options)?,
        None => {
            let mut model = MarkovModel::with_options(3, options)?;
            model.add_text(TEXT, 1);
            model
        }
    };

    // The same text can be added again to bias the frequencies
    model.add_text("The quiet river sleeps under the old bridge.", 2);
    println!("Model size: {} tokens", model.size());

    // Query the model
    println!("P(the) = {:.3}", model.probability("the"));
    println!("Next after 'the': {:?}", model.completions(&["the"], None)?);
    let pre: &[&str] = &["the"];
    let post: &[&str] = &["dog"];
    println!("Between 'the' and 'dog': {:?}", model.completions(pre, Some(post))?);

    // Invalid configuration is reported immediately
    match MarkovModel::new(1) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("{e}"),
    }
    match model.generate(&GenerateOptions::default().with_temperature(0.0)) {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("{e}"),
    }

    // Generate 5 sentences of 5 to 20 tokens
    let options = GenerateOptions::default().with_lengths(5, 20);
    for (i, sentence) in model.generate_many(5, &options)?.iter().enumerate() {
        println!("Generated sentence {}: {}", i + 1, sentence);
    }

    // Seeded, low temperature and reproducible
    let options = GenerateOptions {
        seed: Some(Seed::Text("The old".to_owned())),
        temperature: Some(0.5),
        rng_seed: Some(42),
        ..Default::default()
    };
    match model.generate(&options) {
        Ok(sentence) => println!("Seeded sentence: {sentence}"),
        Err(e @ (MarkovError::Exhausted { .. } | MarkovError::NoSentenceStart { .. })) => {
            println!("No sentence found: {e}")
        }
        Err(e) => return Err(e.into()),
    }

    // JSON round trip
    let json = model.to_json()?;
    let copy = MarkovModel::from_json(&json)?;
    println!("Restored model size: {} tokens ({} bytes of JSON)", copy.size(), json.len());

    Ok(())
}
