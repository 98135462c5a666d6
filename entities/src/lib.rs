pub mod book_content;
pub mod user_reads;
