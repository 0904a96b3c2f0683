//! Optional appendix.

use reportgen_markup::transform;
use tracing::{debug, info, warn};

use crate::llm::TextGenerator;

pub fn decision_prompt(topic: &str) -> String {
    format!(
        "Based on the report topic \"{topic}\", would an appendix section for extra data, source code, \
         or a glossary be beneficial? Please respond with a full sentence, starting with YES or NO."
    )
}

pub fn content_prompt(topic: &str) -> String {
    format!(
        "Generate content for an appendix section of a report on \"{topic}\".\n\
         FORMAT: Use simple markdown. Start each new appendix with a markdown header (`## Appendix A: Title`). \
         Then provide the content for that appendix. Do not add any introduction or explanation before the first header.\n\
         Example:\n\
         ## Appendix A: Raw Data Tables\n\
         ... content for appendix A ...\n\n\
         ## Appendix B: Glossary of Terms\n\
         ... content for appendix B ..."
    )
}

/// Whether a decision response is affirmative.
pub fn wants_appendix(response: &str) -> bool {
    response.to_uppercase().contains("YES")
}

/// Decide whether the report gets an appendix and, if so, write it.
///
/// `None` covers a negative decision, any model failure, and an empty
/// content response. The content call is only made after a "YES".
pub async fn generate_appendix(topic: &str, generator: &dyn TextGenerator) -> Option<String> {
    let decision = match generator.generate(&decision_prompt(topic)).await {
        Ok(text) => text,
        Err(failure) => {
            warn!(error = %failure, "Appendix decision failed, skipping appendix");
            return None;
        }
    };

    if !wants_appendix(&decision) {
        debug!("Model declined an appendix");
        return None;
    }

    let content = match generator.generate(&content_prompt(topic)).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            warn!("Appendix content was empty, skipping appendix");
            return None;
        }
        Err(failure) => {
            warn!(error = %failure, "Could not generate appendix content");
            return None;
        }
    };

    info!("Generated appendix");
    Some(format!(
        "\\appendix\n\\clearpage\n\\addcontentsline{{toc}}{{section}}{{Appendices}}\n{}",
        transform(&content)
    ))
}
