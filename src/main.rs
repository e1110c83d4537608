use std::sync::Arc;

use quiz_bot::config::Config;
use quiz_bot::quiz::distributor::{self, Distributor, Reveal, Verdict};
use quiz_bot::quiz::library::{self, QuizLibrary};
use quiz_bot::quiz::store::{MemoryStore, QuestionStore, RedisStore};
use teloxide::{
    dispatching::dialogue::InMemStorage,
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup},
};

type QuizDialogue = Dialogue<State, InMemStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    Answering,
}

#[tokio::main]
async fn main() {
    // Loads `.env` too, so it runs before the logger reads RUST_LOG.
    let config = Config::from_env();
    pretty_env_logger::init();
    log::info!("Starting quiz bot...");

    let config = match config {
        Ok(config) => config,
        Err(err) => {
            log::error!("Configuration error: {}", err);
            return;
        }
    };

    if let Some(archive) = &config.qa_archive {
        if archive.exists() {
            if let Err(err) = library::unpack_archive(archive, &config.qa_folder) {
                log::error!("Failed to unpack {}: {}", archive.display(), err);
            }
        } else {
            log::warn!("Quiz archive {} not found", archive.display());
        }
    }

    let store: Arc<dyn QuestionStore> = match config.redis.clone() {
        Some(info) => match RedisStore::connect(info).await {
            Ok(store) => Arc::new(store),
            Err(err) => {
                log::error!("Failed to connect to Redis: {}", err);
                return;
            }
        },
        None => {
            log::warn!("No Redis configured, questions are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let distributor = Arc::new(
        Distributor::new(store, QuizLibrary::new(&config.qa_folder))
            .with_encoding(config.qa_encoding),
    );
    // A fresh corpus on every start; requests retry the load if this fails.
    if let Err(err) = distributor.load_corpus().await {
        log::warn!(
            "Could not preload questions from {}: {}",
            distributor.library().folder().display(),
            err
        );
    }

    let bot = Bot::new(&config.tg_bot_token);

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, InMemStorage<State>, State>()
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(dptree::case![State::Answering].endpoint(answering)),
    )
    .dependencies(dptree::deps![InMemStorage::<State>::new(), distributor])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
}

const NEW_QUESTION: &str = "Новый вопрос";
const GIVE_UP: &str = "Сдаться";
const MY_SCORE: &str = "Мой счет";

const NO_QUESTION_TEXT: &str = "Вы не получали вопрос. Нажмите 'Новый вопрос'.";
const LOAD_FAILED_TEXT: &str = "Не удалось загрузить вопрос.";

fn menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(NEW_QUESTION), KeyboardButton::new(GIVE_UP)],
        vec![KeyboardButton::new(MY_SCORE)],
    ])
}

const GREETING_TEXT: &str = "Здравствуйте!\nЯ бот, который проведет для вас викторину.\nНажмите \"Новый вопрос\", чтобы начать.";
async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT)
        .reply_markup(menu_keyboard())
        .await?;

    dialogue.update(State::Answering).await?;
    Ok(())
}

async fn answering(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    distributor: Arc<Distributor>,
) -> HandlerResult {
    let user_id = distributor::user_id("tg", msg.chat.id.0);

    match msg.text() {
        Some("/start") => start(bot, dialogue, msg.clone()).await,
        Some(NEW_QUESTION) => send_new_question(&bot, &msg, &distributor, &user_id).await,
        Some(GIVE_UP) => give_up(&bot, &msg, &distributor, &user_id).await,
        // Scores are not tracked
        Some(MY_SCORE) => {
            bot.send_message(msg.chat.id, "Вы лидируете")
                .reply_markup(menu_keyboard())
                .await?;
            Ok(())
        }
        Some(text) => solution_attempt(&bot, &msg, &distributor, &user_id, text).await,
        None => {
            bot.send_message(msg.chat.id, "Пожалуйста, ответьте текстом")
                .await?;
            Ok(())
        }
    }
}

async fn send_new_question(
    bot: &Bot,
    msg: &Message,
    distributor: &Distributor,
    user_id: &str,
) -> HandlerResult {
    let reply = match distributor.get_random_question(user_id).await {
        Ok(Some(issued)) => issued.question,
        Ok(None) => LOAD_FAILED_TEXT.to_string(),
        Err(err) => {
            log::error!("Failed to issue a question to {}: {}", user_id, err);
            LOAD_FAILED_TEXT.to_string()
        }
    };

    bot.send_message(msg.chat.id, reply)
        .reply_markup(menu_keyboard())
        .await?;
    Ok(())
}

async fn give_up(bot: &Bot, msg: &Message, distributor: &Distributor, user_id: &str) -> HandlerResult {
    let reply = match distributor.give_up(user_id).await {
        Ok(Reveal::Answer { answer, .. }) => format!("Правильный ответ:\n{}", answer),
        Ok(Reveal::Stale { .. }) => {
            "Вопросы обновились, ответ на прошлый вопрос потерян.".to_string()
        }
        Ok(Reveal::NoActiveQuestion) => NO_QUESTION_TEXT.to_string(),
        Err(err) => {
            log::error!("Failed to reveal the answer for {}: {}", user_id, err);
            bot.send_message(msg.chat.id, LOAD_FAILED_TEXT)
                .reply_markup(menu_keyboard())
                .await?;
            return Ok(());
        }
    };
    bot.send_message(msg.chat.id, reply).await?;

    send_new_question(bot, msg, distributor, user_id).await
}

async fn solution_attempt(
    bot: &Bot,
    msg: &Message,
    distributor: &Distributor,
    user_id: &str,
    user_answer: &str,
) -> HandlerResult {
    let reply = match distributor.check_user_answer(user_id, user_answer).await {
        Ok(Verdict::Correct { answer }) => {
            format!("Правильно! Поздравляем.\nПравильный ответ:\n{}", answer)
        }
        Ok(Verdict::Incorrect) => {
            "Неправильно. Попробуйте ещё раз или нажмите 'Сдаться'.".to_string()
        }
        Ok(Verdict::Stale) => {
            "Этот вопрос больше недоступен. Нажмите 'Новый вопрос'.".to_string()
        }
        Ok(Verdict::NoActiveQuestion) => NO_QUESTION_TEXT.to_string(),
        Err(err) => {
            log::error!("Failed to check the answer of {}: {}", user_id, err);
            LOAD_FAILED_TEXT.to_string()
        }
    };

    bot.send_message(msg.chat.id, reply)
        .reply_markup(menu_keyboard())
        .await?;
    Ok(())
}
