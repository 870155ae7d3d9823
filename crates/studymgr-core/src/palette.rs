//! Display hints shared by every view: hex colors used by the app theme,
//! the matching ANSI codes for the terminal, and short labels.

use crate::calendar::DotColor;
use crate::heatmap::IntensityBand;
use crate::task::{
  Priority,
  Source,
  Status
};

pub const FALLBACK_HEX: &str = "#6B7280";

impl Priority {
  pub fn hex(self) -> &'static str {
    match self {
      | Priority::High => "#EF4444",
      | Priority::Medium => "#F59E0B",
      | Priority::Low => "#10B981"
    }
  }

  pub fn ansi(self) -> &'static str {
    match self {
      | Priority::High => "31",
      | Priority::Medium => "33",
      | Priority::Low => "32"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Priority::High => "HIGH",
      | Priority::Medium => "MEDIUM",
      | Priority::Low => "LOW"
    }
  }
}

impl Status {
  pub fn hex(self) -> &'static str {
    match self {
      | Status::Completed => "#10B981",
      | Status::InProgress => {
        "#3B82F6"
      }
      | Status::Pending => FALLBACK_HEX
    }
  }

  pub fn ansi(self) -> &'static str {
    match self {
      | Status::Completed => "32",
      | Status::InProgress => "34",
      | Status::Pending => "90"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Status::Completed => {
        "COMPLETED"
      }
      | Status::InProgress => {
        "IN PROGRESS"
      }
      | Status::Pending => "PENDING"
    }
  }
}

impl Source {
  pub fn label(self) -> &'static str {
    match self {
      | Source::Manual => "Manual",
      | Source::Canvas => "Canvas",
      | Source::GoogleCalendar => {
        "Google Calendar"
      }
    }
  }
}

impl DotColor {
  pub fn hex(self) -> &'static str {
    match self {
      | DotColor::Overdue => "#EF4444",
      | DotColor::Completed => "#10B981",
      | DotColor::Pending => "#F59E0B"
    }
  }

  pub fn ansi(self) -> &'static str {
    match self {
      | DotColor::Overdue => "31",
      | DotColor::Completed => "32",
      | DotColor::Pending => "33"
    }
  }
}

impl IntensityBand {
  pub fn hex(self) -> &'static str {
    match self {
      | IntensityBand::None => "#E5E7EB",
      | IntensityBand::Low => "#C7D2FE",
      | IntensityBand::Medium => {
        "#818CF8"
      }
      | IntensityBand::High => "#6366F1",
      | IntensityBand::Peak => "#4338CA"
    }
  }

  /// 256-color background code, lightest to darkest.
  pub fn ansi(self) -> &'static str {
    match self {
      | IntensityBand::None => "48;5;254",
      | IntensityBand::Low => "48;5;189",
      | IntensityBand::Medium => {
        "48;5;105"
      }
      | IntensityBand::High => "48;5;63",
      | IntensityBand::Peak => "48;5;55"
    }
  }
}
