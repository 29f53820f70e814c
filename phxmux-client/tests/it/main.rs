mod close;
mod dispatch;
mod helper;
mod join;
mod push;
