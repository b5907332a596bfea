//! Instruction text for the two generation tasks.

use lorerag_core::types::PromptBundle;

pub const IMAGE_PROMPT_SYSTEM: &str = "You are an assistant that creates concise but vivid \
image prompts for a text-to-image model like Stable Diffusion.\n\n\
You work in a sci-fi noir detective universe. Use the lore context if helpful, \
but do NOT mention 'lore', 'context', or brackets in the final prompt.\n\
The final prompt should be a single sentence or short paragraph, \
focusing on visual details: setting, mood, lighting, key objects, and characters.";

pub const STORY_SYSTEM: &str = "You are a skilled sci-fi noir storyteller. You write short, \
atmospheric stories set in a futuristic detective universe. Your stories are grounded, vivid, and \
focus on mood, character, and subtle mystery.\n\n\
You will be given:\n\
- an image caption (describing what appears in the image)\n\
- some universe lore (locations, characters, rules, themes)\n\n\
Your job is to write a coherent story that:\n\
- is consistent with both the caption and the lore\n\
- feels like a detective or mystery story in a sci-fi world\n\
- uses concrete sensory details (light, sound, weather, tech)\n\
- has a beginning, middle, and an implied or soft ending\n\
- stays between roughly 300 and 700 words.";

pub fn image_prompt(user_prompt: &str, lore_context: &str) -> PromptBundle {
    let user_instruction = format!(
        "User original prompt:\n{}\n\n\
         Relevant universe lore:\n{lore_context}\n\n\
         Task:\n\
         Write ONE rich image prompt that Stable Diffusion can use to generate an image matching \
         the user's idea and the tone of this universe. \
         Do not include line breaks or labels, only the prompt.",
        user_prompt.trim()
    );
    PromptBundle {
        system_instruction: IMAGE_PROMPT_SYSTEM.to_string(),
        user_instruction,
    }
}

pub fn story_prompt(caption: &str, lore_context: &str) -> PromptBundle {
    let user_instruction = format!(
        "Image caption:\n{caption}\n\n\
         Relevant universe lore:\n{lore_context}\n\n\
         Task:\n\
         Write a short story inspired by the image and grounded in the lore.\n\
         Do NOT mention the words 'caption', 'lore', or any list labels.\n\
         Write in third person, with a moody, cinematic tone."
    );
    PromptBundle {
        system_instruction: STORY_SYSTEM.to_string(),
        user_instruction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_prompt_embeds_request_and_context() {
        let p = image_prompt("  a detective on a rooftop \n", "[LORE 1]\nNeon rain.");
        let user = &p.user_instruction;
        let head = "User original prompt:\na detective on a rooftop\n\n";
        assert!(user.starts_with(head));
        let lore = "Relevant universe lore:\n[LORE 1]\nNeon rain.\n\nTask:\n";
        assert!(user.contains(lore));
        assert!(user.contains("Write ONE rich image prompt"));
        let sys = &p.system_instruction;
        let rule = "do NOT mention 'lore', 'context', or brackets";
        assert!(sys.contains(rule));
    }

    #[test]
    fn story_prompt_lines_are_not_indented() {
        let p = story_prompt("a man under a streetlight", "");
        let user = &p.user_instruction;
        let head = "Image caption:\na man under a streetlight\n\n";
        assert!(user.starts_with(head));
        assert!(user.lines().all(|l| !l.starts_with(' ')));
        assert!(user.ends_with("moody, cinematic tone."));
        assert!(p.system_instruction.contains("300 and 700 words"));
    }
}
