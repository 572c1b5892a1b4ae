mod command;
mod list_xml;

pub use command::CommandRepo;
