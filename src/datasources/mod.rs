pub mod openweathermap;

pub use openweathermap::OpenWeatherMapClient;
