pub mod rabbitmq;

pub use rabbitmq::RabbitMqService;
