//! Init wizard: interactive setup with cliclack styled prompts.

use rand::{distributions::Alphanumeric, Rng};
use std::path::Path;

/// Length of the generated webhook secret.
pub const SECRET_LEN: usize = 32;

/// Random alphanumeric webhook secret.
pub fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect()
}

/// The key is typed behind a mask, so it only has to be non-empty.
#[allow(clippy::ptr_arg)]
fn validate_api_key(input: &String) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        Err("API key cannot be empty; answer 'no' above to skip")
    } else {
        Ok(())
    }
}

/// Run the interactive init wizard, writing `config_path`.
pub fn run(config_path: &str) -> anyhow::Result<()> {
    cliclack::intro("chatter init")?;

    if Path::new(config_path).exists() {
        cliclack::log::warning(format!(
            "{config_path} already exists, skipping.\nDelete it and run 'chatter init' again to regenerate."
        ))?;
        cliclack::outro_cancel("Nothing changed")?;
        return Ok(());
    }

    // 1. Bot token.
    let bot_token: String = cliclack::password("Telegram bot token (from @BotFather)")
        .mask('▪')
        .validate(|input: &String| {
            if input.trim().len() < 20 {
                Err("Bot token is required and should be at least 20 characters")
            } else {
                Ok(())
            }
        })
        .interact()?;

    // 2. Authorized user.
    let user_id: String = cliclack::input("Your Telegram user ID")
        .placeholder("Send /start to @userinfobot")
        .validate(|input: &String| match input.trim().parse::<i64>() {
            Ok(id) if id != 0 => Ok(()),
            _ => Err("User ID must be a non-zero number"),
        })
        .interact()?;
    let user_id: i64 = user_id.trim().parse()?;

    // 3. Backend key.
    let api_key: String = if cliclack::confirm("Set an OpenAI API key now?")
        .initial_value(true)
        .interact()?
    {
        cliclack::password("OpenAI API key")
            .mask('▪')
            .validate(validate_api_key)
            .interact()?
    } else {
        cliclack::log::info("Skipped. Set backend.api_key or CHATTER_API_KEY later.")?;
        String::new()
    };

    // 4. Secret and config.
    let secret = generate_secret();
    let config = generate_config(bot_token.trim(), user_id, &secret, api_key.trim());
    std::fs::write(config_path, config)?;
    cliclack::log::success(format!("Generated {config_path}"))?;

    let steps = format!(
        "Your webhook secret (save this!):\n{secret}\n\n\
         1. Run: chatter start\n\
         2. Start ngrok: ngrok http 3847\n\
         3. Register the webhook:\n   \
            curl \"https://api.telegram.org/bot<TOKEN>/setWebhook?url=<PUBLIC_URL>/webhook&secret_token={secret}\""
    );
    cliclack::note("Next steps", &steps)?;
    cliclack::outro("Chatter configured!")?;
    Ok(())
}

/// Generate config.toml content from wizard inputs (pure function for testability).
pub fn generate_config(bot_token: &str, user_id: i64, secret: &str, api_key: &str) -> String {
    let api_key_line = if api_key.is_empty() {
        "# api_key = \"\"  # or env: CHATTER_API_KEY".to_string()
    } else {
        format!("api_key = \"{api_key}\"")
    };

    format!(
        r#"[chatter]
name = "Chatter"
log_level = "info"
# log_file = "~/.chatter/logs/chatter.log"

[server]
host = "0.0.0.0"
port = 3847

[telegram]
bot_token = "{bot_token}"
secret_token = "{secret}"
allowed_user_id = {user_id}

[backend]
kind = "openai"
base_url = "https://api.openai.com/v1"
{api_key_line}
model = "gpt-4o"

[workspace]
root = "."
active_file = ""
"#
    )
}
